//! Wikitext 预览渲染
//!
//! 基于正则的轻量渲染器，只覆盖课程内容常用的语法子集：
//! 注释、引用、模板、标题、粗斜体、内外链、列表、分隔线与段落。
//! 输入先整体做 HTML 转义，后续规则只生成固定的标签。

use std::sync::OnceLock;

use anyhow::anyhow;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::domain::ValidationErrors;
use crate::error::ApiResult;
use crate::state::AppState;

const MAX_PREVIEW_LEN: usize = 200_000;

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub html: String,
}

/// 预编译的规则
struct Rules {
    comment: Regex,
    reference: Regex,
    template: Regex,
    /// h6 到 h2，长的先匹配
    headings: Vec<(u8, Regex)>,
    bold_italic: Regex,
    bold: Regex,
    italic: Regex,
    piped_link: Regex,
    link: Regex,
    labeled_external: Regex,
    bare_external: Regex,
    rule: Regex,
}

impl Rules {
    fn compile() -> Result<Self, regex::Error> {
        let mut headings = Vec::with_capacity(5);
        for level in (2..=6u8).rev() {
            let marks = "=".repeat(level as usize);
            let pattern = format!(r"(?m)^{m}[ \t]*(.+?)[ \t]*{m}[ \t]*$", m = marks);
            headings.push((level, Regex::new(&pattern)?));
        }

        Ok(Self {
            comment: Regex::new(r"(?s)&lt;!--.*?--&gt;")?,
            reference: Regex::new(r"(?s)&lt;ref\b[^\n]*?&gt;(.*?)&lt;/ref&gt;")?,
            template: Regex::new(r"\{\{([^{}]*)\}\}")?,
            headings,
            bold_italic: Regex::new(r"'''''(.+?)'''''")?,
            bold: Regex::new(r"'''(.+?)'''")?,
            italic: Regex::new(r"''(.+?)''")?,
            piped_link: Regex::new(r"\[\[([^\[\]|]+)\|([^\[\]]+)\]\]")?,
            link: Regex::new(r"\[\[([^\[\]|]+)\]\]")?,
            labeled_external: Regex::new(r"\[(https?://[^\s\]]+)[ \t]+([^\]]+)\]")?,
            bare_external: Regex::new(r"\[(https?://[^\s\]]+)\]")?,
            rule: Regex::new(r"(?m)^-{4,}[ \t]*$")?,
        })
    }
}

static RULES: OnceLock<Result<Rules, regex::Error>> = OnceLock::new();

fn rules() -> anyhow::Result<&'static Rules> {
    RULES
        .get_or_init(Rules::compile)
        .as_ref()
        .map_err(|e| anyhow!("invalid wikitext pattern: {}", e))
}

/// 预览接口
pub fn preview(state: &AppState, req: PreviewRequest) -> ApiResult<PreviewResponse> {
    let mut errors = ValidationErrors::new();
    errors.check(
        req.text.chars().count() <= MAX_PREVIEW_LEN,
        "text",
        format!("text must be at most {} characters", MAX_PREVIEW_LEN),
    );
    errors.finish()?;

    let html = render(&req.text, &state.config.wiki_base_url)?;
    Ok(PreviewResponse { html })
}

/// 渲染 wikitext 为 HTML
pub fn render(text: &str, wiki_base_url: &str) -> anyhow::Result<String> {
    let r = rules()?;
    let text = text.replace("\r\n", "\n");

    let s = escape_html(&text);
    let s = r.comment.replace_all(&s, "");

    let mut ref_no = 0;
    let s = r.reference.replace_all(&s, |_: &Captures| {
        ref_no += 1;
        format!("<sup class=\"reference\">[{}]</sup>", ref_no)
    });

    let s = r
        .template
        .replace_all(&s, "<span class=\"template\">${1}</span>");

    let mut s = s.into_owned();
    for (level, re) in &r.headings {
        s = re
            .replace_all(&s, format!("<h{l}>${{1}}</h{l}>", l = level).as_str())
            .into_owned();
    }

    let s = r.bold_italic.replace_all(&s, "<b><i>${1}</i></b>");
    let s = r.bold.replace_all(&s, "<b>${1}</b>");
    let s = r.italic.replace_all(&s, "<i>${1}</i>");

    let s = r.piped_link.replace_all(&s, |c: &Captures| {
        wiki_link(wiki_base_url, &c[1], c[2].trim())
    });
    let s = r
        .link
        .replace_all(&s, |c: &Captures| wiki_link(wiki_base_url, &c[1], c[1].trim()));

    let s = r.labeled_external.replace_all(
        &s,
        "<a href=\"${1}\" class=\"external\" rel=\"nofollow\">${2}</a>",
    );
    let s = r
        .bare_external
        .replace_all(&s, "<a href=\"${1}\" class=\"external\" rel=\"nofollow\">${1}</a>");

    let s = group_lists(&s);
    let s = r.rule.replace_all(&s, "<hr/>");

    Ok(wrap_paragraphs(&s))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn wiki_link(base: &str, page: &str, label: &str) -> String {
    let target = page.trim().replace(' ', "_");
    format!(
        "<a href=\"{}{}\" class=\"wikilink\">{}</a>",
        base, target, label
    )
}

/// `*` 行归入 `<ul>`，`#` 行归入 `<ol>`，连续的同类行合并为一个列表
fn group_lists(s: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut open: Option<&str> = None;

    for line in s.lines() {
        let tag = if line.starts_with('*') {
            Some("ul")
        } else if line.starts_with('#') {
            Some("ol")
        } else {
            None
        };

        if open != tag {
            if let Some(t) = open {
                out.push(format!("</{}>", t));
            }
            if let Some(t) = tag {
                out.push(format!("<{}>", t));
            }
            open = tag;
        }

        match tag {
            Some(_) => {
                let item = line.trim_start_matches(|c: char| c == '*' || c == '#').trim();
                out.push(format!("<li>{}</li>", item));
            }
            None => out.push(line.to_string()),
        }
    }
    if let Some(t) = open {
        out.push(format!("</{}>", t));
    }

    out.join("\n")
}

const BLOCK_PREFIXES: &[&str] = &[
    "<h2>", "<h3>", "<h4>", "<h5>", "<h6>", "<hr/>", "<ul>", "</ul>", "<ol>", "</ol>", "<li>",
];

fn is_block(line: &str) -> bool {
    BLOCK_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// 空行分隔的普通文本块包成 `<p>`，块级元素原样保留
fn wrap_paragraphs(s: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut para: Vec<&str> = Vec::new();

    fn flush(para: &mut Vec<&str>, out: &mut Vec<String>) {
        if !para.is_empty() {
            out.push(format!("<p>{}</p>", para.join("\n")));
            para.clear();
        }
    }

    for line in s.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush(&mut para, &mut out);
        } else if is_block(trimmed) {
            flush(&mut para, &mut out);
            out.push(trimmed.to_string());
        } else {
            para.push(trimmed);
        }
    }
    flush(&mut para, &mut out);

    out.join("\n")
}
