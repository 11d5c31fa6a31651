use chrono::{Duration, Utc};
use serde_json::json;
use townsquare::{
    config::WeatherConfig,
    services::{OpenMeteoClient, WeatherProvider},
};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn client_for(server: &MockServer, failure_threshold: u32) -> OpenMeteoClient {
    OpenMeteoClient::from_config(&WeatherConfig {
        enabled: true,
        base_url: server.uri(),
        timeout_ms: 500,
        failure_threshold,
        cooldown_secs: 60,
    })
    .unwrap()
}

fn forecast_body(day: &str) -> serde_json::Value {
    json!({
        "latitude": 59.33,
        "longitude": 18.07,
        "timezone": "UTC",
        "daily": {
            "time": [day],
            "weather_code": [61],
            "temperature_2m_max": [14.2],
            "relative_humidity_2m_mean": [81.0],
            "wind_speed_10m_max": [17.5]
        }
    })
}

#[tokio::test]
async fn forecast_for_today_is_populated() {
    let server = MockServer::start().await;
    let today = Utc::now().date_naive();
    let day = today.format("%Y-%m-%d").to_string();

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "59.3293"))
        .and(query_param("start_date", day.as_str()))
        .and(query_param("end_date", day.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(&day)))
        .expect(1)
        .mount(&server)
        .await;

    let forecast = client_for(&server, 3)
        .forecast("Kungsträdgården, Stockholm", today)
        .await
        .expect("forecast");

    assert_eq!(forecast.temperature, 14.2);
    assert_eq!(forecast.humidity, 81.0);
    assert_eq!(forecast.wind_speed, 17.5);
    assert_eq!(forecast.description, "Light rain");
    assert_eq!(forecast.icon, "🌧️");
}

#[tokio::test]
async fn malformed_payload_is_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"daily\": \"sunny\"}"))
        .mount(&server)
        .await;

    let today = Utc::now().date_naive();
    assert!(client_for(&server, 3).forecast("Borås", today).await.is_none());
}

#[tokio::test]
async fn error_status_is_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let today = Utc::now().date_naive();
    assert!(client_for(&server, 3).forecast("Lund", today).await.is_none());
}

#[tokio::test]
async fn slow_provider_times_out_to_absent() {
    let server = MockServer::start().await;
    let today = Utc::now().date_naive();
    let day = today.format("%Y-%m-%d").to_string();
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(forecast_body(&day))
                .set_delay(std::time::Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    assert!(client_for(&server, 3).forecast("Umeå", today).await.is_none());
}

#[tokio::test]
async fn dates_outside_the_horizon_make_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let today = Utc::now().date_naive();
    assert!(client.forecast("Borås", today + Duration::days(20)).await.is_none());
    assert!(client.forecast("Borås", today - Duration::days(1)).await.is_none());
}

#[tokio::test]
async fn repeated_failures_open_the_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let today = Utc::now().date_naive();
    for _ in 0..4 {
        assert!(client.forecast("Gävle", today).await.is_none());
    }
}
