use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PATIENT_ROLE: &str = "patient";

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Every role the user holds, primary `role` claim first.
    pub fn all_roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = self.role.iter().cloned().collect();
        for role in &self.roles {
            if !roles.contains(role) {
                roles.push(role.clone());
            }
        }
        roles
    }
}

/// Caller identity handed to the booking wizard when it is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub token: String,
    pub is_authenticated: bool,
    pub roles: Vec<String>,
}

impl Session {
    pub fn authenticated(user: &User, token: &str) -> Self {
        Self {
            user_id: user.id.clone(),
            token: token.to_string(),
            is_authenticated: true,
            roles: user.all_roles(),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            user_id: String::new(),
            token: String::new(),
            is_authenticated: false,
            roles: Vec::new(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn is_patient(&self) -> bool {
        self.is_authenticated && self.has_role(PATIENT_ROLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Option<&str>, roles: &[&str]) -> User {
        User {
            id: "user-1".to_string(),
            email: None,
            role: role.map(str::to_string),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            metadata: None,
            created_at: None,
        }
    }

    #[test]
    fn roles_merge_claim_and_metadata() {
        let u = user(Some("authenticated"), &["patient", "authenticated"]);
        assert_eq!(u.all_roles(), vec!["authenticated", "patient"]);
    }

    #[test]
    fn patient_session_requires_authentication() {
        let session = Session::authenticated(&user(Some("patient"), &[]), "tok");
        assert!(session.is_patient());

        let mut anonymous = Session::anonymous();
        anonymous.roles.push("patient".to_string());
        assert!(!anonymous.is_patient());
    }

    #[test]
    fn doctor_session_is_not_patient() {
        let session = Session::authenticated(&user(Some("doctor"), &[]), "tok");
        assert!(!session.is_patient());
    }
}
