// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn api_error_body_display_includes_code() {
    let err = ApiErrorBody {
        code: "NOT_FOUND".to_string(),
        message: "session abc123 not found".to_string(),
        details: serde_json::Value::Null,
    };
    let rendered = err.to_string();
    assert!(rendered.contains("session abc123 not found"));
    assert!(rendered.contains("NOT_FOUND"));
}

#[test]
fn not_found_conflict_and_invalid_params_classify_as_user_errors() {
    for code in ["NOT_FOUND", "CONFLICT", "INVALID_PARAMS", "PORT_ERROR", "SPAWN_ERROR"] {
        let err = ClientError::Api(ApiErrorBody {
            code: code.to_string(),
            message: "boom".to_string(),
            details: serde_json::Value::Null,
        });
        let anyhow_err = err.into_anyhow();
        let exit = anyhow_err
            .downcast_ref::<crate::exit_error::ExitError>()
            .expect("ExitError must be in the chain");
        assert_eq!(exit.code, 1, "{code} should be a user error");
    }
}

#[test]
fn internal_error_and_timeout_classify_as_system_errors() {
    for code in ["INTERNAL_ERROR", "TIMEOUT", "NOT_READY"] {
        let err = ClientError::Api(ApiErrorBody {
            code: code.to_string(),
            message: "boom".to_string(),
            details: serde_json::Value::Null,
        });
        let anyhow_err = err.into_anyhow();
        let exit = anyhow_err
            .downcast_ref::<crate::exit_error::ExitError>()
            .expect("ExitError must be in the chain");
        assert_eq!(exit.code, 2, "{code} should be a system error");
    }
}

#[test]
fn client_error_message_survives_into_anyhow_context() {
    let err = ClientError::Api(ApiErrorBody {
        code: "NOT_FOUND".to_string(),
        message: "session abc123 not found".to_string(),
        details: serde_json::Value::Null,
    });
    let anyhow_err = err.into_anyhow();
    assert!(anyhow_err.to_string().contains("session abc123 not found"));
}

#[test]
fn default_base_url_falls_back_without_env_var() {
    std::env::remove_var("DEVHOST_URL");
    assert_eq!(default_base_url(), "http://127.0.0.1:8081");
}

#[test]
fn port_field_serializes_as_untagged_number_or_string() {
    let fixed = serde_json::to_value(PortField::Fixed(3000)).unwrap();
    assert_eq!(fixed, serde_json::json!(3000));

    let auto = serde_json::to_value(PortField::Auto("auto".to_string())).unwrap();
    assert_eq!(auto, serde_json::json!("auto"));
}
