use crate::api::errors::ApiError;

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )))
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Lowercases and deduplicates `requested`, keeping first-seen order, and
/// rejects anything outside `supported`.
pub(crate) fn normalize_languages(
    requested: &[String],
    supported: &[String],
) -> Result<Vec<String>, ApiError> {
    let mut languages: Vec<String> = Vec::with_capacity(requested.len());

    for language in requested {
        let language = language.trim().to_ascii_lowercase();
        if !supported.iter().any(|candidate| candidate == &language) {
            return Err(ApiError::BadRequest(format!(
                "Language '{language}' is not supported; choose from {}",
                supported.join(", ")
            )));
        }
        if !languages.contains(&language) {
            languages.push(language);
        }
    }

    if languages.is_empty() {
        return Err(ApiError::BadRequest("At least one language is required".to_string()));
    }

    Ok(languages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported() -> Vec<String> {
        ["python", "java", "cpp"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn languages_are_lowercased_and_deduplicated() {
        let requested = vec!["Python".to_string(), "cpp".to_string(), "python ".to_string()];
        let normalized = normalize_languages(&requested, &supported()).unwrap();
        assert_eq!(normalized, vec!["python".to_string(), "cpp".to_string()]);
    }

    #[test]
    fn unsupported_or_empty_languages_are_rejected() {
        assert!(normalize_languages(&["cobol".to_string()], &supported()).is_err());
        assert!(normalize_languages(&[], &supported()).is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password_len("short").is_err());
        assert!(validate_password_len("long-enough").is_ok());
    }

    #[test]
    fn emails_are_normalised() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
