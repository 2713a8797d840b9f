//! OpenAPI 文档
//!
//! `ROUTES` 是全部 HTTP 路由的登记表，`/api/docs/openapi.json` 由它生成。
//! 新增路由时必须同时登记，集成测试会比对 `src/api` 中的 `.route(...)` 与此表。

use serde_json::{json, Map, Value};

use crate::config::env::constants::VERSION;

/// 一条路由的文档信息
#[derive(Clone, Copy, Debug)]
pub struct RouteDoc {
    pub method: &'static str,
    /// axum 风格路径（`:param`）
    pub path: &'static str,
    pub tag: &'static str,
    /// 是否需要 bearer token
    pub auth: bool,
    pub summary: &'static str,
}

const fn route(
    method: &'static str,
    path: &'static str,
    tag: &'static str,
    auth: bool,
    summary: &'static str,
) -> RouteDoc {
    RouteDoc {
        method,
        path,
        tag,
        auth,
        summary,
    }
}

pub const ROUTES: &[RouteDoc] = &[
    // System
    route("GET", "/health", "System", false, "Service health, version, uptime and collection counts"),
    route("GET", "/api/docs/openapi.json", "System", false, "This OpenAPI document"),
    // Auth
    route("POST", "/api/auth/register", "Auth", false, "Register a student account"),
    route("POST", "/api/auth/login", "Auth", false, "Log in and receive a bearer token"),
    route("POST", "/api/auth/logout", "Auth", true, "Invalidate the current token"),
    route("GET", "/api/auth/me", "Auth", true, "Current user"),
    // Users
    route("GET", "/api/users", "Users", true, "List users (admin)"),
    route("PATCH", "/api/users/me", "Users", true, "Update my profile"),
    route("GET", "/api/users/:id", "Users", false, "Public profile"),
    route("PATCH", "/api/users/:id/role", "Users", true, "Change a user's role (admin)"),
    // Courses
    route("GET", "/api/courses", "Courses", false, "List courses with filters and pagination"),
    route("POST", "/api/courses", "Courses", true, "Create a course (instructor)"),
    route("GET", "/api/courses/:id", "Courses", false, "Course detail with modules and lesson outline"),
    route("PATCH", "/api/courses/:id", "Courses", true, "Update a course"),
    route("DELETE", "/api/courses/:id", "Courses", true, "Delete a course and its content"),
    route("POST", "/api/courses/:id/publish", "Courses", true, "Publish a course"),
    route("POST", "/api/courses/:id/unpublish", "Courses", true, "Unpublish a course"),
    route("GET", "/api/courses/:id/modules", "Modules", false, "Modules of a course"),
    route("POST", "/api/courses/:id/modules", "Modules", true, "Add a module"),
    route("PUT", "/api/courses/:id/modules/reorder", "Modules", true, "Reorder all modules of a course"),
    route("GET", "/api/courses/:id/enrollments", "Enrollments", true, "Enrollments of a course (instructor)"),
    // Modules
    route("PATCH", "/api/modules/:id", "Modules", true, "Update a module"),
    route("DELETE", "/api/modules/:id", "Modules", true, "Delete a module and its lessons"),
    route("GET", "/api/modules/:id/lessons", "Lessons", true, "Lessons of a module"),
    route("POST", "/api/modules/:id/lessons", "Lessons", true, "Add a lesson"),
    // Lessons
    route("GET", "/api/lessons/:id", "Lessons", true, "Lesson content (quiz answers hidden from students)"),
    route("PATCH", "/api/lessons/:id", "Lessons", true, "Update a lesson"),
    route("DELETE", "/api/lessons/:id", "Lessons", true, "Delete a lesson"),
    route("POST", "/api/lessons/:id/complete", "Lessons", true, "Mark a text or video lesson complete"),
    route("POST", "/api/lessons/:id/quiz/submit", "Quizzes", true, "Submit quiz answers for grading"),
    route("GET", "/api/lessons/:id/submissions", "Assignments", true, "Submissions for an assignment (instructor)"),
    route("POST", "/api/lessons/:id/submissions", "Assignments", true, "Submit an assignment"),
    route("PUT", "/api/lessons/:id/submissions/mine", "Assignments", true, "Update my ungraded submission"),
    // Enrollments
    route("POST", "/api/enrollments", "Enrollments", true, "Enroll in a published course"),
    route("GET", "/api/enrollments/me", "Enrollments", true, "My enrollments"),
    route("GET", "/api/enrollments/course/:course_id", "Enrollments", true, "My enrollment in a course"),
    route("DELETE", "/api/enrollments/course/:course_id", "Enrollments", true, "Drop a course"),
    // Submissions
    route("GET", "/api/submissions/me", "Assignments", true, "My submissions"),
    route("GET", "/api/submissions/:id", "Assignments", true, "A submission"),
    route("POST", "/api/submissions/:id/grade", "Assignments", true, "Grade a submission (instructor)"),
    // Certificates
    route("POST", "/api/certificates", "Certificates", true, "Issue the certificate for a completed course"),
    route("GET", "/api/certificates/me", "Certificates", true, "My certificates"),
    route("GET", "/api/certificates/verify/:number", "Certificates", false, "Verify a certificate number"),
    route("GET", "/api/certificates/:id", "Certificates", true, "A certificate"),
    // Learning paths
    route("GET", "/api/learning-paths", "Learning paths", false, "List learning paths"),
    route("POST", "/api/learning-paths", "Learning paths", true, "Create a learning path (instructor)"),
    route("GET", "/api/learning-paths/:id", "Learning paths", false, "A learning path"),
    route("PATCH", "/api/learning-paths/:id", "Learning paths", true, "Update a learning path"),
    route("DELETE", "/api/learning-paths/:id", "Learning paths", true, "Delete a learning path"),
    route("GET", "/api/learning-paths/:id/progress", "Learning paths", true, "My progress along a path"),
    // Notifications
    route("GET", "/api/notifications", "Notifications", true, "My notifications"),
    route("GET", "/api/notifications/unread-count", "Notifications", true, "Unread notification count"),
    route("GET", "/api/notifications/stream", "Notifications", true, "Live notifications (Server-Sent Events)"),
    route("POST", "/api/notifications/read-all", "Notifications", true, "Mark all notifications read"),
    route("POST", "/api/notifications/broadcast", "Notifications", true, "Broadcast a system notification (admin)"),
    route("PATCH", "/api/notifications/:id/read", "Notifications", true, "Mark a notification read"),
    route("DELETE", "/api/notifications/:id", "Notifications", true, "Delete a notification"),
    // Forum
    route("GET", "/api/forum/posts", "Forum", false, "List posts, pinned first"),
    route("POST", "/api/forum/posts", "Forum", true, "Create a post"),
    route("GET", "/api/forum/posts/:id", "Forum", false, "A post with comments"),
    route("PATCH", "/api/forum/posts/:id", "Forum", true, "Edit my post"),
    route("DELETE", "/api/forum/posts/:id", "Forum", true, "Delete a post (author or admin)"),
    route("POST", "/api/forum/posts/:id/comments", "Forum", true, "Comment on a post"),
    route("DELETE", "/api/forum/posts/:id/comments/:comment_id", "Forum", true, "Delete a comment"),
    route("POST", "/api/forum/posts/:id/upvote", "Forum", true, "Toggle my upvote"),
    route("PATCH", "/api/forum/posts/:id/moderate", "Forum", true, "Pin or lock a post (instructor)"),
    // Wikitext
    route("POST", "/api/wikitext/preview", "Wikitext", false, "Render wikitext to HTML"),
    // Uploads
    route("POST", "/api/uploads/video", "Uploads", true, "Upload a lesson video (multipart field `file`)"),
    route("POST", "/api/uploads/thumbnail", "Uploads", true, "Upload a course thumbnail (multipart field `file`)"),
];

/// `:param` 转为 OpenAPI 的 `{param}`
pub fn openapi_path(path: &str) -> String {
    path.split('/')
        .map(|seg| match seg.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => seg.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn path_params(path: &str) -> Vec<&str> {
    path.split('/').filter_map(|seg| seg.strip_prefix(':')).collect()
}

fn operation(doc: &RouteDoc) -> Value {
    let mut op = Map::new();
    op.insert("summary".into(), json!(doc.summary));
    op.insert("tags".into(), json!([doc.tag]));
    op.insert(
        "operationId".into(),
        json!(format!(
            "{}_{}",
            doc.method.to_lowercase(),
            doc.path
                .trim_start_matches('/')
                .replace(['/', '-', '.'], "_")
                .replace(':', "")
        )),
    );

    let params: Vec<Value> = path_params(doc.path)
        .into_iter()
        .map(|name| {
            json!({
                "name": name,
                "in": "path",
                "required": true,
                "schema": { "type": "string" }
            })
        })
        .collect();
    if !params.is_empty() {
        op.insert("parameters".into(), Value::Array(params));
    }

    if matches!(doc.method, "POST" | "PUT" | "PATCH") {
        let body = if doc.tag == "Uploads" {
            json!({
                "required": true,
                "content": {
                    "multipart/form-data": {
                        "schema": {
                            "type": "object",
                            "properties": { "file": { "type": "string", "format": "binary" } },
                            "required": ["file"]
                        }
                    }
                }
            })
        } else {
            json!({
                "required": false,
                "content": { "application/json": { "schema": { "type": "object" } } }
            })
        };
        op.insert("requestBody".into(), body);
    }

    if doc.auth {
        op.insert("security".into(), json!([{ "bearerAuth": [] }]));
    }

    let error = json!({
        "description": "Error envelope",
        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorEnvelope" } } }
    });
    let mut responses = Map::new();
    responses.insert(
        "200".into(),
        json!({
            "description": "Success envelope",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/SuccessEnvelope" } } }
        }),
    );
    for code in ["400", "404", "500"] {
        responses.insert(code.into(), error.clone());
    }
    if doc.auth {
        responses.insert("401".into(), error.clone());
        responses.insert("403".into(), error);
    }
    op.insert("responses".into(), Value::Object(responses));

    Value::Object(op)
}

/// 生成 OpenAPI 3.0 文档
pub fn document() -> Value {
    let mut paths = Map::new();
    for doc in ROUTES {
        let item = paths
            .entry(openapi_path(doc.path))
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = item {
            methods.insert(doc.method.to_lowercase(), operation(doc));
        }
    }

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "WikiWalkthrough API",
            "version": VERSION,
            "description": "Learning platform for Wikipedia editing: courses, lessons, quizzes, certificates, forums and notifications."
        },
        "paths": paths,
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer" }
            },
            "schemas": {
                "SuccessEnvelope": {
                    "type": "object",
                    "required": ["success", "message"],
                    "properties": {
                        "success": { "type": "boolean", "example": true },
                        "message": { "type": "string" },
                        "data": {}
                    }
                },
                "ErrorEnvelope": {
                    "type": "object",
                    "required": ["success", "message"],
                    "properties": {
                        "success": { "type": "boolean", "example": false },
                        "message": { "type": "string" },
                        "errors": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "field": { "type": "string" },
                                    "message": { "type": "string" }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}
