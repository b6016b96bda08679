use gamepulse_core::{
    ApiError, ConfigError, CoreError, DashboardError, DashboardResource, DataSource, ErrorExt,
    ErrorReporter,
};

#[test]
fn test_error_codes() {
    let api_error = CoreError::Api(ApiError::RequestTimeout {
        endpoint: "/status".to_string(),
    });
    assert_eq!(api_error.error_code(), "API");

    let dashboard_error = DashboardError::Connectivity {
        details: "connection refused".to_string(),
    };
    assert_eq!(dashboard_error.error_code(), "DASHBOARD_CONNECTIVITY");

    let config_error = CoreError::Config(ConfigError::ValidationFailed {
        reason: "timeout".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    let refresh = DashboardError::RefreshFailed {
        failed: vec![DashboardResource::ThemeDistribution],
        details: "theme-distribution: 500".to_string(),
    };
    assert_eq!(refresh.error_code(), "DASHBOARD_REFRESH_FAILED");
}

#[test]
fn test_retryable_errors() {
    let server_error = CoreError::Api(ApiError::ServerError {
        endpoint: "/wordcloud".to_string(),
        status_code: 500,
        detail: None,
    });
    assert!(server_error.is_retryable());

    let bad_payload = CoreError::Api(ApiError::InvalidResponse {
        endpoint: "/top-comments".to_string(),
        details: "missing field `body`".to_string(),
    });
    assert!(!bad_payload.is_retryable());

    let unsupported = DashboardError::UnsupportedSource {
        data_source: DataSource::YouTube,
    };
    assert!(!unsupported.is_retryable());
}

#[test]
fn test_user_friendly_messages() {
    let connectivity = DashboardError::Connectivity {
        details: "connection refused".to_string(),
    };
    assert_eq!(
        connectivity.user_friendly_message(),
        "Failed to connect to the API server. Please ensure it is running."
    );

    let load = DashboardError::LoadFailed {
        details: "bad path".to_string(),
    };
    assert!(load.user_friendly_message().contains("check file paths"));

    let refresh = DashboardError::RefreshFailed {
        failed: vec![DashboardResource::Wordcloud, DashboardResource::TopComments],
        details: "two failures".to_string(),
    };
    assert_eq!(
        refresh.user_friendly_message(),
        "Failed to fetch data from the API."
    );

    let unsupported = DashboardError::UnsupportedSource {
        data_source: DataSource::AppStore,
    };
    assert_eq!(
        unsupported.user_friendly_message(),
        "App Store is not available yet."
    );
}

#[test]
fn test_refresh_failure_lists_resources() {
    let failures = vec![
        (
            DashboardResource::ThemeDistribution,
            CoreError::Api(ApiError::ServerError {
                endpoint: "/theme-distribution".to_string(),
                status_code: 500,
                detail: Some("division by zero".to_string()),
            }),
        ),
        (
            DashboardResource::Wordcloud,
            CoreError::Api(ApiError::RequestTimeout {
                endpoint: "/wordcloud".to_string(),
            }),
        ),
    ];

    let error = DashboardError::refresh_failed(&failures);
    match &error {
        DashboardError::RefreshFailed { failed, details } => {
            assert_eq!(
                failed,
                &vec![
                    DashboardResource::ThemeDistribution,
                    DashboardResource::Wordcloud
                ]
            );
            assert!(details.contains("theme-distribution"));
            assert!(details.contains("division by zero"));
        }
        other => panic!("Expected RefreshFailed, got {other:?}"),
    }
    assert!(error.to_string().contains("2 resource(s)"));
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new()
        .with_error_reporting(true)
        .with_warning_reporting(true);
    let error = CoreError::Api(ApiError::RequestTimeout {
        endpoint: "/status".to_string(),
    });

    // Only checks that reporting does not panic without a subscriber.
    reporter.report_error(&error);
    reporter.report_warning(&error);
}
