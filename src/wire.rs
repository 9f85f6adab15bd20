use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SignUpRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Pulls the backend's `message` or `error` string out of a parsed
/// response body. Only JSON objects carry one; `message` wins when both
/// are usable strings.
pub fn server_message(body: &serde_json::Value) -> Option<String> {
    let object = body.as_object()?;
    ["message", "error"]
        .into_iter()
        .filter_map(|field| object.get(field).and_then(serde_json::Value::as_str))
        .find(|message| !message.trim().is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::server_message;

    #[test]
    fn message_wins_over_error() {
        let body = json!({"message": "Listing not found", "error": "x"});
        assert_eq!(server_message(&body), Some("Listing not found".to_owned()));
    }

    #[test]
    fn error_field_is_used_when_message_missing() {
        let body = json!({"success": false, "error": "Wrong credentials"});
        assert_eq!(server_message(&body), Some("Wrong credentials".to_owned()));
    }

    #[test]
    fn non_string_or_missing_fields_yield_none() {
        assert_eq!(server_message(&json!({})), None);
        assert_eq!(server_message(&json!({"message": 42})), None);
        assert_eq!(server_message(&json!({"message": "  "})), None);
    }

    #[test]
    fn array_bodies_carry_no_message() {
        assert_eq!(server_message(&json!(["Listing gone", "x"])), None);
        assert_eq!(server_message(&json!("Listing gone")), None);
    }

    #[test]
    fn error_string_survives_non_string_message() {
        let body = json!({"message": 42, "error": "Wrong credentials"});
        assert_eq!(server_message(&body), Some("Wrong credentials".to_owned()));
    }
}
