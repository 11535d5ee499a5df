use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::LazyLock;

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?\d{10,15}$").expect("valid phone pattern"));

/// 去掉空格、短横线和括号
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect()
}

/// 校验手机号：可选的 `+` 加 10 到 15 位数字
pub fn validate_phone(phone: &str) -> AppResult<String> {
    let normalized = normalize_phone(phone.trim());
    if !PHONE_REGEX.is_match(&normalized) {
        return Err(AppError::ValidationError(
            "Phone number must be 10 to 15 digits".to_string(),
        ));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone("0501234567").unwrap(), "0501234567");
        assert_eq!(validate_phone("+966501234567").unwrap(), "+966501234567");
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("+9665012345678901").is_err());
        assert!(validate_phone("05012abc67").is_err());
    }

    #[test]
    fn test_validate_phone_strips_formatting() {
        assert_eq!(validate_phone(" 050-123 4567 ").unwrap(), "0501234567");
        assert_eq!(validate_phone("(050) 1234567").unwrap(), "0501234567");
    }
}
