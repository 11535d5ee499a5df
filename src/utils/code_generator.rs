use rand::Rng;

/// 生成访问码：`{prefix}-{四位数字}`，数字范围 1000..=9999
pub fn generate_access_code(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    format!("{}-{}", prefix, rng.gen_range(1000..=9999))
}

/// Record id with a short type prefix, e.g. `C-3f2a...` or `BOK-...`.
pub fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_access_code() {
        let code = generate_access_code("NICE");
        let (prefix, digits) = code.split_once('-').unwrap();
        assert_eq!(prefix, "NICE");
        assert_eq!(digits.len(), 4);

        let n: u32 = digits.parse().unwrap();
        assert!((1000..=9999).contains(&n));
    }

    #[test]
    fn test_generate_access_code_custom_prefix() {
        assert!(generate_access_code("VIP").starts_with("VIP-"));
    }

    #[test]
    fn test_generate_id_is_prefixed_and_distinct() {
        let a = generate_id("BOK");
        let b = generate_id("BOK");
        assert!(a.starts_with("BOK-"));
        assert_ne!(a, b);
    }
}
