//! 结业证书

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 证书文档，(userId, courseId) 唯一
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub certificate_number: String,
    pub course_title: String,
    pub recipient_name: String,
    pub issued_at: DateTime<Utc>,
}

/// 生成证书编号：`WW-YYYYMMDD-XXXXXXXX`
pub fn certificate_number(issued_at: DateTime<Utc>) -> String {
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase();
    format!("WW-{}-{}", issued_at.format("%Y%m%d"), suffix)
}

/// 申请证书
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCertificateRequest {
    pub course_id: String,
}
