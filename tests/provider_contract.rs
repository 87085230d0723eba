//! Contract tests for the provider adapters: capability matrices, payload
//! mapping from canned upstream bodies, and upstream status classification.

use skyfeed_tests::*;

#[tokio::test]
async fn capability_matrix_matches_the_provider_lineup() {
    let openweather = OpenWeatherAdapter::with_http_client(
        Some("k".into()),
        Arc::new(ScriptedHttpClient::bodies(&[])),
    );
    let weatherapi = WeatherApiAdapter::with_http_client(
        Some("k".into()),
        Arc::new(ScriptedHttpClient::bodies(&[])),
    );
    let accuweather = AccuWeatherAdapter::with_http_client(
        Some("k".into()),
        Arc::new(ScriptedHttpClient::bodies(&[])),
    );
    let noaa = NoaaAdapter::with_http_client(Arc::new(ScriptedHttpClient::bodies(&[])));

    assert_eq!(openweather.capabilities().supported_types(), vec!["current", "forecast"]);
    assert_eq!(
        weatherapi.capabilities().supported_types(),
        vec!["current", "forecast", "historical"]
    );
    assert_eq!(accuweather.capabilities().supported_types(), vec!["current"]);
    assert_eq!(noaa.capabilities().supported_types(), vec!["forecast"]);
}

#[tokio::test]
async fn every_keyed_adapter_rejects_a_fetch_without_credentials() {
    let client = Arc::new(ScriptedHttpClient::bodies(&["{}"]));
    let request = FetchRequest::new(seoul(), DataType::Current);

    let openweather = OpenWeatherAdapter::with_http_client(None, client.clone());
    let weatherapi = WeatherApiAdapter::with_http_client(None, client.clone());
    let accuweather = AccuWeatherAdapter::with_http_client(None, client.clone());

    for error in [
        openweather.fetch(request).await.expect_err("no key"),
        weatherapi.fetch(request).await.expect_err("no key"),
        accuweather.fetch(request).await.expect_err("no key"),
    ] {
        assert_eq!(error.kind(), SourceErrorKind::MissingCredentials);
        assert!(!error.retryable());
    }
    assert_eq!(client.request_count(), 0, "credential checks precede any call");
}

#[tokio::test]
async fn noaa_needs_no_credentials_at_all() {
    let client = Arc::new(ScriptedHttpClient::bodies(&[
        r#"{"properties": {"forecast": "https://api.weather.gov/gridpoints/BOU/62,61/forecast"}}"#,
        r#"{"properties": {"periods": [
            {"startTime": "2026-08-30T06:00:00-06:00", "temperature": 68,
             "temperatureUnit": "F", "windSpeed": "10 mph",
             "relativeHumidity": {"value": 60}, "shortForecast": "Sunny"}
        ]}}"#,
    ]));
    let adapter = NoaaAdapter::with_http_client(client);

    let record = adapter
        .fetch(FetchRequest::new(denver(), DataType::Forecast))
        .await
        .expect("keyless fetch succeeds");

    assert_eq!(record.source, ProviderId::Noaa);
    assert_eq!(record.data_type, DataType::Forecast);
    assert!(record.fields.temperature_c.expect("converted") < 25.0, "F converted to C");
}

#[tokio::test]
async fn openweather_current_body_maps_to_canonical_units() {
    let client = Arc::new(ScriptedHttpClient::bodies(&[r#"{
        "main": {"temp": 21.4, "humidity": 63, "pressure": 1013},
        "wind": {"speed": 3.1},
        "weather": [{"description": "scattered clouds"}],
        "dt": 1723200000
    }"#]));
    let adapter = OpenWeatherAdapter::with_http_client(Some("k".into()), client.clone());

    let record = adapter
        .fetch(FetchRequest::new(seoul(), DataType::Current))
        .await
        .expect("fetch succeeds");

    assert_eq!(record.fields.temperature_c, Some(21.4));
    assert_eq!(record.fields.wind_speed_ms, Some(3.1));
    assert_eq!(record.fields.precipitation_mm, Some(0.0), "no rain block means 0mm");
    assert_eq!(record.observed_at.format_rfc3339(), "2024-08-09T10:40:00Z");
    assert!(client.requested_urls()[0].contains("units=metric"));
}

#[tokio::test]
async fn weatherapi_converts_kph_winds_to_meters_per_second() {
    let client = Arc::new(ScriptedHttpClient::bodies(&[r#"{
        "current": {
            "last_updated_epoch": 1723200000, "temp_c": 24.0, "humidity": 55,
            "wind_kph": 36.0, "precip_mm": 1.2, "pressure_mb": 1012.0,
            "condition": {"text": "Rain"}
        }
    }"#]));
    let adapter = WeatherApiAdapter::with_http_client(Some("k".into()), client);

    let record = adapter
        .fetch(FetchRequest::new(seoul(), DataType::Current))
        .await
        .expect("fetch succeeds");

    let wind = record.fields.wind_speed_ms.expect("wind present");
    assert!((wind - 10.0).abs() < 1e-9, "36 kph is 10 m/s");
    assert_eq!(record.fields.precipitation_mm, Some(1.2));
}

#[tokio::test]
async fn accuweather_runs_its_two_step_location_sequence() {
    let client = Arc::new(ScriptedHttpClient::bodies(&[
        r#"{"Key": "226081"}"#,
        r#"[{"EpochTime": 1723200000, "WeatherText": "Cloudy",
            "Temperature": {"Metric": {"Value": 19.0}},
            "RelativeHumidity": 70,
            "Wind": {"Speed": {"Metric": {"Value": 7.2}}},
            "Pressure": {"Metric": {"Value": 1009.0}},
            "Precip1hr": {"Metric": {"Value": 0.4}}}]"#,
    ]));
    let adapter = AccuWeatherAdapter::with_http_client(Some("k".into()), client.clone());

    let record = adapter
        .fetch(FetchRequest::new(seoul(), DataType::Current))
        .await
        .expect("fetch succeeds");

    let urls = client.requested_urls();
    assert!(urls[0].contains("geoposition/search"));
    assert!(urls[1].contains("/currentconditions/v1/226081"));
    assert_eq!(record.fields.temperature_c, Some(19.0));
    let wind = record.fields.wind_speed_ms.expect("wind present");
    assert!((wind - 2.0).abs() < 1e-9, "7.2 km/h is 2 m/s");
}

#[tokio::test]
async fn rate_limit_responses_classify_as_retryable() {
    let adapter = OpenWeatherAdapter::with_http_client(
        Some("k".into()),
        Arc::new(ScriptedHttpClient::status(429)),
    );

    let error = adapter
        .fetch(FetchRequest::new(seoul(), DataType::Current))
        .await
        .expect_err("429 must fail");

    assert_eq!(error.kind(), SourceErrorKind::RateLimited);
    assert!(error.retryable());
}

#[tokio::test]
async fn server_errors_classify_as_transient_transport_failures() {
    let adapter = WeatherApiAdapter::with_http_client(
        Some("k".into()),
        Arc::new(ScriptedHttpClient::status(503)),
    );

    let error = adapter
        .fetch(FetchRequest::new(seoul(), DataType::Current))
        .await
        .expect_err("503 must fail");

    assert_eq!(error.kind(), SourceErrorKind::Transport);
    assert!(error.retryable());
}

#[tokio::test]
async fn auth_rejections_are_fatal() {
    let adapter = OpenWeatherAdapter::with_http_client(
        Some("wrong-key".into()),
        Arc::new(ScriptedHttpClient::status(401)),
    );

    let error = adapter
        .fetch(FetchRequest::new(seoul(), DataType::Current))
        .await
        .expect_err("401 must fail");

    assert_eq!(error.kind(), SourceErrorKind::Provider);
    assert!(!error.retryable());
}

#[tokio::test]
async fn garbage_bodies_are_fatal_malformed_response_errors() {
    let adapter = WeatherApiAdapter::with_http_client(
        Some("k".into()),
        Arc::new(ScriptedHttpClient::bodies(&["<html>not json</html>"])),
    );

    let error = adapter
        .fetch(FetchRequest::new(seoul(), DataType::Current))
        .await
        .expect_err("malformed body must fail");

    assert_eq!(error.kind(), SourceErrorKind::Provider);
    assert!(!error.retryable());
}

#[tokio::test]
async fn unsupported_data_types_fail_before_any_network_traffic() {
    let client = Arc::new(ScriptedHttpClient::bodies(&["{}"]));
    let adapter = NoaaAdapter::with_http_client(client.clone());

    let error = adapter
        .fetch(FetchRequest::new(denver(), DataType::Historical))
        .await
        .expect_err("forecast-only source");

    assert_eq!(error.kind(), SourceErrorKind::UnsupportedDataType);
    assert_eq!(client.request_count(), 0);
}
