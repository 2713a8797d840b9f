//! 论坛服务

use chrono::Utc;
use tracing::info;

use crate::domain::forum::{
    CommentRequest, CreatePostRequest, ForumPostSummary, ModerateRequest, PostFilter,
    UpdatePostRequest,
};
use crate::domain::{Comment, ForumPost, Notification, NotificationKind, Page, PageQuery, User};
use crate::error::{ApiError, ApiResult};
use crate::services::notifications;
use crate::state::AppState;

pub async fn get(state: &AppState, id: &str) -> ApiResult<ForumPost> {
    state
        .store
        .forum_posts
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Post '{}'", id)))
}

/// 帖子列表：置顶在前，其余按时间倒序
pub async fn list(state: &AppState, filter: &PostFilter, page: PageQuery) -> Page<ForumPostSummary> {
    let mut posts = state
        .store
        .forum_posts
        .find(|p| {
            filter
                .course_id
                .as_ref()
                .map_or(true, |c| p.course_id.as_ref() == Some(c))
                && filter
                    .tag
                    .as_ref()
                    .map_or(true, |t| p.tags.iter().any(|pt| pt.eq_ignore_ascii_case(t)))
        })
        .await;
    posts.sort_by(|a, b| {
        b.pinned
            .cmp(&a.pinned)
            .then(b.created_at.cmp(&a.created_at))
    });
    Page::paginate(posts, page).map(|p| ForumPostSummary::from(&p))
}

pub async fn create(state: &AppState, user: &User, req: CreatePostRequest) -> ApiResult<ForumPost> {
    req.validate()?;
    if let Some(course_id) = &req.course_id {
        if state.store.courses.get(course_id).await.is_none() {
            return Err(ApiError::bad_request(format!("Course '{}' does not exist", course_id)));
        }
    }

    let now = Utc::now();
    let post = ForumPost {
        id: uuid::Uuid::new_v4().to_string(),
        course_id: req.course_id,
        author_id: user.id.clone(),
        title: req.title.trim().to_string(),
        body: req.body,
        tags: normalize_tags(req.tags),
        pinned: false,
        locked: false,
        upvotes: Vec::new(),
        comments: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let post = state.store.forum_posts.insert(post).await?;
    info!(post_id = %post.id, author_id = %user.id, "Forum post created");
    Ok(post)
}

/// 标签去空白、转小写、去重
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

pub async fn update(
    state: &AppState,
    user: &User,
    id: &str,
    req: UpdatePostRequest,
) -> ApiResult<ForumPost> {
    req.validate()?;
    state
        .store
        .forum_posts
        .try_update(id, |p| {
            if p.author_id != user.id {
                return Err(ApiError::forbidden("Only the author can edit this post"));
            }
            if let Some(title) = req.title {
                p.title = title.trim().to_string();
            }
            if let Some(body) = req.body {
                p.body = body;
            }
            if let Some(tags) = req.tags {
                p.tags = normalize_tags(tags);
            }
            p.updated_at = Utc::now();
            Ok(())
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Post '{}'", id)))
}

pub async fn delete(state: &AppState, user: &User, id: &str) -> ApiResult<()> {
    let post = get(state, id).await?;
    if post.author_id != user.id && !user.is_admin() {
        return Err(ApiError::forbidden("Only the author or an admin can delete this post"));
    }
    state.store.forum_posts.remove(id).await?;
    info!(post_id = %id, by = %user.id, "Forum post deleted");
    Ok(())
}

/// 发表评论；锁定的帖子拒绝评论
pub async fn add_comment(
    state: &AppState,
    user: &User,
    post_id: &str,
    req: CommentRequest,
) -> ApiResult<ForumPost> {
    req.validate()?;
    let comment = Comment {
        id: uuid::Uuid::new_v4().to_string(),
        author_id: user.id.clone(),
        body: req.body,
        created_at: Utc::now(),
    };

    let post = state
        .store
        .forum_posts
        .try_update(post_id, |p| {
            if p.locked {
                return Err(ApiError::forbidden("This post is locked"));
            }
            p.comments.push(comment);
            p.updated_at = Utc::now();
            Ok(())
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Post '{}'", post_id)))?;

    if post.author_id != user.id {
        notifications::notify(
            state,
            Notification::new(
                &post.author_id,
                NotificationKind::ForumReply,
                "New reply to your post",
                format!("{} replied to \"{}\"", user.name, post.title),
            )
            .with_link(format!("/forum/{}", post.id)),
        )
        .await?;
    }

    Ok(post)
}

pub async fn delete_comment(
    state: &AppState,
    user: &User,
    post_id: &str,
    comment_id: &str,
) -> ApiResult<ForumPost> {
    state
        .store
        .forum_posts
        .try_update(post_id, |p| {
            let pos = p
                .comments
                .iter()
                .position(|c| c.id == comment_id)
                .ok_or_else(|| ApiError::not_found(format!("Comment '{}'", comment_id)))?;
            if p.comments[pos].author_id != user.id && !user.is_admin() {
                return Err(ApiError::forbidden(
                    "Only the comment author or an admin can delete this comment",
                ));
            }
            p.comments.remove(pos);
            Ok(())
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Post '{}'", post_id)))
}

pub async fn toggle_upvote(state: &AppState, user: &User, post_id: &str) -> ApiResult<ForumPost> {
    state
        .store
        .forum_posts
        .update(post_id, |p| {
            p.toggle_upvote(&user.id);
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Post '{}'", post_id)))
}

/// 置顶 / 锁帖（讲师或管理员）
pub async fn moderate(
    state: &AppState,
    user: &User,
    post_id: &str,
    req: ModerateRequest,
) -> ApiResult<ForumPost> {
    if !user.role.can_author() {
        return Err(ApiError::forbidden("Only instructors can moderate posts"));
    }
    let post = state
        .store
        .forum_posts
        .update(post_id, |p| {
            if let Some(pinned) = req.pinned {
                p.pinned = pinned;
            }
            if let Some(locked) = req.locked {
                p.locked = locked;
            }
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Post '{}'", post_id)))?;
    info!(post_id = %post_id, pinned = post.pinned, locked = post.locked, "Post moderated");
    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::services::courses::tests::user_with_role;

    fn post_req(title: &str, tags: &[&str]) -> CreatePostRequest {
        CreatePostRequest {
            course_id: None,
            title: title.to_string(),
            body: "How do I add an infobox?".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn comment(body: &str) -> CommentRequest {
        CommentRequest {
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_pinned_first_and_tag_filter() {
        let state = AppState::in_memory();
        let admin = user_with_role(&state, "a@wiki.org", Role::Admin).await;
        let old = create(&state, &admin, post_req("Old", &["Help"])).await.unwrap();
        create(&state, &admin, post_req("New", &["meta"])).await.unwrap();
        moderate(
            &state,
            &admin,
            &old.id,
            ModerateRequest {
                pinned: Some(true),
                locked: None,
            },
        )
        .await
        .unwrap();

        let page = list(&state, &PostFilter::default(), PageQuery::default()).await;
        assert_eq!(page.items[0].title, "Old");

        let filter = PostFilter {
            course_id: None,
            tag: Some("help".into()),
        };
        let page = list(&state, &filter, PageQuery::default()).await;
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].tags, vec!["help"]);
    }

    #[tokio::test]
    async fn test_comments_notify_and_respect_lock() {
        let state = AppState::in_memory();
        let author = user_with_role(&state, "a@wiki.org", Role::Student).await;
        let replier = user_with_role(&state, "r@wiki.org", Role::Student).await;
        let mod_user = user_with_role(&state, "m@wiki.org", Role::Instructor).await;
        let post = create(&state, &author, post_req("Infobox?", &[])).await.unwrap();

        add_comment(&state, &author, &post.id, comment("bump")).await.unwrap();
        let post2 = add_comment(&state, &replier, &post.id, comment("Use {{Infobox}}"))
            .await
            .unwrap();
        assert_eq!(post2.comments.len(), 2);
        let replies = state
            .store
            .notifications
            .count(|n| n.user_id == author.id && n.kind == NotificationKind::ForumReply)
            .await;
        assert_eq!(replies, 1);

        let cid = post2.comments[1].id.clone();
        assert!(matches!(
            delete_comment(&state, &author, &post.id, &cid).await,
            Err(ApiError::Forbidden(_))
        ));
        delete_comment(&state, &replier, &post.id, &cid).await.unwrap();

        assert!(matches!(
            moderate(&state, &replier, &post.id, ModerateRequest::default()).await,
            Err(ApiError::Forbidden(_))
        ));
        moderate(
            &state,
            &mod_user,
            &post.id,
            ModerateRequest {
                pinned: None,
                locked: Some(true),
            },
        )
        .await
        .unwrap();
        assert!(matches!(
            add_comment(&state, &replier, &post.id, comment("late")).await,
            Err(ApiError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_edit_and_upvote() {
        let state = AppState::in_memory();
        let author = user_with_role(&state, "a@wiki.org", Role::Student).await;
        let other = user_with_role(&state, "o@wiki.org", Role::Student).await;
        let post = create(&state, &author, post_req("Typo", &[])).await.unwrap();

        let req = UpdatePostRequest {
            title: Some("Hijacked".into()),
            ..Default::default()
        };
        assert!(matches!(
            update(&state, &other, &post.id, req).await,
            Err(ApiError::Forbidden(_))
        ));

        let voted = toggle_upvote(&state, &other, &post.id).await.unwrap();
        assert_eq!(voted.upvotes, vec![other.id.clone()]);
        let unvoted = toggle_upvote(&state, &other, &post.id).await.unwrap();
        assert!(unvoted.upvotes.is_empty());

        assert!(delete(&state, &other, &post.id).await.is_err());
        delete(&state, &author, &post.id).await.unwrap();
    }
}
