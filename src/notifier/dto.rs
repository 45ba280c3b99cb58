use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApprovedPayload<'a> {
    pub email: &'a str,
    #[serde(rename = "studentId")]
    pub student_id: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RejectedPayload<'a> {
    pub email: &'a str,
}
