//! 证书服务

use chrono::Utc;
use tracing::info;

use crate::domain::certificate::certificate_number;
use crate::domain::{Certificate, EnrollmentStatus, User};
use crate::error::{ApiError, ApiResult};
use crate::services::{courses, enrollments};
use crate::state::{AppState, StoreError};

/// 签发证书
///
/// 报名状态必须为 completed；已签发过时直接返回已有证书
pub async fn issue(state: &AppState, user: &User, course_id: &str) -> ApiResult<Certificate> {
    let completed = enrollments::find(state, &user.id, course_id)
        .await
        .map_or(false, |e| e.status == EnrollmentStatus::Completed);
    if !completed {
        return Err(ApiError::bad_request(
            "A certificate is only available after completing the course",
        ));
    }

    if let Some(existing) = find(state, &user.id, course_id).await {
        return Ok(existing);
    }

    let course = courses::load(state, course_id).await?;
    let issued_at = Utc::now();
    let certificate = Certificate {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        course_id: course_id.to_string(),
        certificate_number: certificate_number(issued_at),
        course_title: course.title,
        recipient_name: user.name.clone(),
        issued_at,
    };

    let user_id = user.id.clone();
    match state
        .store
        .certificates
        .insert_unique(
            certificate,
            |c| c.user_id == user_id && c.course_id == course_id,
            "Certificate already issued",
        )
        .await
    {
        Ok(certificate) => {
            info!(
                user_id = %user.id,
                course_id = %course_id,
                number = %certificate.certificate_number,
                "Certificate issued"
            );
            Ok(certificate)
        }
        // 并发签发时以先写入的为准
        Err(StoreError::Conflict(_)) => find(state, &user.id, course_id)
            .await
            .ok_or_else(|| ApiError::internal("Certificate disappeared during issue")),
        Err(e) => Err(e.into()),
    }
}

async fn find(state: &AppState, user_id: &str, course_id: &str) -> Option<Certificate> {
    state
        .store
        .certificates
        .find_one(|c| c.user_id == user_id && c.course_id == course_id)
        .await
}

pub async fn list_mine(state: &AppState, user_id: &str) -> Vec<Certificate> {
    let mut list = state
        .store
        .certificates
        .find(|c| c.user_id == user_id)
        .await;
    list.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
    list
}

/// 获取证书（本人或管理员）
pub async fn get(state: &AppState, user: &User, id: &str) -> ApiResult<Certificate> {
    match state.store.certificates.get(id).await {
        Some(c) if c.user_id == user.id || user.is_admin() => Ok(c),
        _ => Err(ApiError::not_found(format!("Certificate '{}'", id))),
    }
}

/// 公开验证证书编号
pub async fn verify(state: &AppState, number: &str) -> ApiResult<Certificate> {
    let number = number.trim().to_uppercase();
    state
        .store
        .certificates
        .find_one(|c| c.certificate_number == number)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Certificate '{}'", number)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Enrollment, Role};
    use crate::services::courses::tests::{course_request, user_with_role};

    #[tokio::test]
    async fn test_issue_requires_completion_and_is_idempotent() {
        let state = AppState::in_memory();
        let owner = user_with_role(&state, "o@wiki.org", Role::Instructor).await;
        let student = user_with_role(&state, "s@wiki.org", Role::Student).await;
        let course = courses::create(&state, &owner, course_request("Citations")).await.unwrap();

        let enrollment = state
            .store
            .enrollments
            .insert(Enrollment::new(&student.id, &course.id))
            .await
            .unwrap();
        assert!(matches!(
            issue(&state, &student, &course.id).await,
            Err(ApiError::BadRequest(_))
        ));

        state
            .store
            .enrollments
            .update(&enrollment.id, |e| e.status = EnrollmentStatus::Completed)
            .await
            .unwrap();
        let first = issue(&state, &student, &course.id).await.unwrap();
        let second = issue(&state, &student, &course.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.course_title, "Citations");
        assert_eq!(first.recipient_name, "Test User");

        let verified = verify(&state, &first.certificate_number.to_lowercase()).await.unwrap();
        assert_eq!(verified.id, first.id);

        let outsider = user_with_role(&state, "x@wiki.org", Role::Student).await;
        assert!(get(&state, &outsider, &first.id).await.is_err());
        assert!(get(&state, &student, &first.id).await.is_ok());
    }
}
