/// Input checks run on request payloads before they reach a use case.
pub trait ValidateRequest {
    fn validate(&self) -> Result<(), String>;
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("\"{field}\" is not allowed to be empty"));
    }
    Ok(())
}

pub fn require_min_len(field: &str, value: &str, min: usize) -> Result<(), String> {
    if value.trim().chars().count() < min {
        return Err(format!(
            "\"{field}\" length must be at least {min} characters long"
        ));
    }
    Ok(())
}

/// Gateway ids carry a fixed prefix per object type (`cus_`, `price_`, `sub_`, ...).
pub fn require_prefix(field: &str, value: &str, prefix: &str) -> Result<(), String> {
    if !value.starts_with(prefix) || value.len() == prefix.len() {
        return Err(format!(
            "\"{field}\" with value \"{value}\" fails to match the required pattern: /^{prefix}/"
        ));
    }
    Ok(())
}

pub fn require_email(field: &str, value: &str) -> Result<(), String> {
    let invalid = || format!("\"{field}\" must be a valid email");

    let (local, domain) = value.trim().split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || value.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(())
}

pub fn require_one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), String> {
    if !allowed.contains(&value) {
        return Err(format!(
            "\"{field}\" must be one of [{}]",
            allowed.join(", ")
        ));
    }
    Ok(())
}

pub fn require_positive(field: &str, value: i64) -> Result<(), String> {
    if value <= 0 {
        return Err(format!("\"{field}\" must be a positive number"));
    }
    Ok(())
}
