use chrono::NaiveDate;
use serde::Serialize;

use super::vocabulary::AuthenticationProvider;

const PERSONAL_UNIQUE_ID_PREFIX: &str = "urn:schac:personalUniqueID:lt:nationalIDCard:";

/// Attributes of the authenticated user as reported by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub personal_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_provider: Option<AuthenticationProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,
}

impl UserInfo {
    pub fn new(personal_code: impl Into<String>) -> Self {
        Self {
            personal_code: personal_code.into(),
            first_name: None,
            last_name: None,
            email: None,
            company_code: None,
            company_name: None,
            auth_provider: None,
            birthday: None,
        }
    }

    /// Whether the user logged in on behalf of a company
    pub fn is_company_login(&self) -> bool {
        self.company_code.is_some()
    }

    /// SCHAC personal unique id derived from the personal code
    pub fn personal_unique_id(&self) -> String {
        format!("{PERSONAL_UNIQUE_ID_PREFIX}{}", self.personal_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personal_unique_id() {
        let info = UserInfo::new("38001010000");
        assert_eq!(
            info.personal_unique_id(),
            "urn:schac:personalUniqueID:lt:nationalIDCard:38001010000"
        );
        assert!(!info.is_company_login());
    }

    #[test]
    fn test_json_skips_absent_fields() {
        let mut info = UserInfo::new("38001010000");
        info.birthday = NaiveDate::from_ymd_opt(1980, 1, 1);
        info.auth_provider = Some(AuthenticationProvider::Bank);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "personal_code": "38001010000",
                "auth_provider": "auth.lt.bank",
                "birthday": "1980-01-01",
            })
        );
    }
}
