use huginn::error::join_failures;
use huginn::{ErrorEnvelope, HuginnError, ProviderFailure, Result};

#[test]
fn test_error_display() {
    let err = HuginnError::Http {
        status: 429,
        message: "slow down".into(),
    };
    assert_eq!(err.to_string(), "HTTP 429: slow down");
    assert_eq!(
        HuginnError::CredentialsMissing.to_string(),
        "credentials not configured"
    );
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(HuginnError::NoProvider)
    }
    assert!(returns_error().is_err());
}

// ============================================================================
// Status mapping
// ============================================================================

fn http(status: u16) -> HuginnError {
    HuginnError::Http {
        status,
        message: "x".into(),
    }
}

#[test]
fn upstream_statuses_map_to_surface_statuses() {
    assert_eq!(http(404).status_code(), 404);
    assert_eq!(http(400).status_code(), 400);
    assert_eq!(http(422).status_code(), 400);
    // Our credentials or quota, not the caller's input
    assert_eq!(http(401).status_code(), 500);
    assert_eq!(http(403).status_code(), 500);
    assert_eq!(http(429).status_code(), 500);
    assert_eq!(http(500).status_code(), 500);
    assert_eq!(http(503).status_code(), 500);
}

#[test]
fn local_errors_map_to_surface_statuses() {
    assert_eq!(HuginnError::Validation("bad".into()).status_code(), 400);
    assert_eq!(HuginnError::NotFound("gone".into()).status_code(), 404);
    assert_eq!(HuginnError::Transport("reset".into()).status_code(), 500);
    assert_eq!(HuginnError::Decode("eof".into()).status_code(), 500);
    assert_eq!(HuginnError::Storage("locked".into()).status_code(), 500);
    assert_eq!(HuginnError::NoProvider.status_code(), 500);
}

// ============================================================================
// Transient error classification
// ============================================================================

#[test]
fn transient_errors() {
    assert!(HuginnError::Transport("connection reset".into()).is_transient());
    assert!(HuginnError::DeadlineExceeded.is_transient());
    assert!(http(429).is_transient());
    assert!(http(500).is_transient());
    assert!(http(503).is_transient());
}

#[test]
fn non_transient_errors() {
    assert!(!http(400).is_transient());
    assert!(!http(401).is_transient());
    assert!(!HuginnError::Decode("eof".into()).is_transient());
    assert!(!HuginnError::Validation("bad".into()).is_transient());
    assert!(!HuginnError::CredentialsMissing.is_transient());
}

// ============================================================================
// Aggregates
// ============================================================================

#[test]
fn aggregate_message_lists_every_provider() {
    let failures = vec![
        ProviderFailure::from_error("openai", &HuginnError::CredentialsMissing),
        ProviderFailure::from_error("groq", &http(429)),
    ];
    assert_eq!(
        join_failures(&failures),
        "openai: credentials not configured; groq: HTTP 429: x"
    );
    let err = HuginnError::AllProvidersFailed { failures };
    assert_eq!(
        err.to_string(),
        "all providers failed: openai: credentials not configured; groq: HTTP 429: x"
    );
}

#[test]
fn aggregate_is_client_error_only_if_every_attempt_was() {
    let mixed = HuginnError::AllProvidersFailed {
        failures: vec![
            ProviderFailure::from_error("a", &http(400)),
            ProviderFailure::from_error("b", &http(500)),
        ],
    };
    assert!(!mixed.is_client_error());

    let bad_input = HuginnError::AllProvidersFailed {
        failures: vec![
            ProviderFailure::from_error("a", &HuginnError::CredentialsMissing),
            ProviderFailure::from_error("b", &http(400)),
        ],
    };
    assert!(bad_input.is_client_error(), "skipped providers do not count");
    assert_eq!(bad_input.status_code(), 400);

    let skipped = ProviderFailure::skipped("c", &HuginnError::DeadlineExceeded);
    assert!(!skipped.attempted);
    assert_eq!(skipped.to_string(), "c: deadline exceeded");
}

#[test]
fn envelope_carries_message_and_code() {
    let env = ErrorEnvelope::from(&HuginnError::Validation("max_tokens must be between 1 and 4096".into()));
    let json = serde_json::to_value(&env).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "error": {
                "message": "invalid input: max_tokens must be between 1 and 4096",
                "code": "invalid_input"
            }
        })
    );
}

#[test]
fn sqlite_errors_become_storage_errors() {
    let err: HuginnError = rusqlite::Error::InvalidQuery.into();
    assert!(matches!(err, HuginnError::Storage(_)));
}
