use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::constants::DEFAULT_EXCHANGE_RATE;
use crate::core::{
    AccumulationForm, AccumulationRow, DrawdownSummary, ModelOutput, ModelSeriesPoint,
    PositionMetric, PricePoint, SimulationOutcome, SnapshotOutcome, WithdrawalForm,
    WithdrawalRow, assess_position, build_model_series, days_since_genesis, market_snapshot,
    model_output, r_squared, run_accumulation, run_drawdown, series_horizon,
};

const DEFAULT_SERIES_STEP_DAYS: u32 = 30;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelQuery {
    date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PositionQuery {
    price: Option<f64>,
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRequest {
    #[serde(default, alias = "history", alias = "dailyPrices")]
    daily: Vec<PricePoint>,
    #[serde(default, alias = "weeklyPrices")]
    weekly: Vec<PricePoint>,
    #[serde(alias = "currentPrice")]
    current_price_usd: f64,
    #[serde(default)]
    exchange_rate: Option<f64>,
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesRequest {
    #[serde(default)]
    history: Vec<PricePoint>,
    until: NaiveDate,
    #[serde(default)]
    step_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RSquaredRequest {
    series: Vec<PricePoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelResponse {
    date: NaiveDate,
    days_since_genesis: i64,
    #[serde(flatten)]
    model: ModelOutput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PositionResponse {
    date: NaiveDate,
    days_since_genesis: i64,
    price_usd: f64,
    model: ModelOutput,
    position: PositionMetric,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RSquaredResponse {
    r_squared: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DrawdownResponse {
    #[serde(flatten)]
    outcome: SimulationOutcome<WithdrawalRow>,
    summary: Option<DrawdownSummary>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "power-law HTTP API listening");

    axum::serve(listener, router()).await
}

fn router() -> Router {
    Router::new()
        .route("/api/model", get(model_handler))
        .route("/api/position", get(position_handler))
        .route("/api/snapshot", post(snapshot_handler))
        .route("/api/series", post(series_handler))
        .route("/api/r-squared", post(r_squared_handler))
        .route(
            "/api/simulate/accumulation",
            get(accumulation_get_handler).post(accumulation_post_handler),
        )
        .route(
            "/api/simulate/drawdown",
            get(drawdown_get_handler).post(drawdown_post_handler),
        )
        .fallback(not_found_handler)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

// Same local calendar as the CLI.
fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn model_handler(query: Result<Query<ModelQuery>, QueryRejection>) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    json_response(StatusCode::OK, model_reply(query.date.unwrap_or_else(today)))
}

fn model_reply(date: NaiveDate) -> ModelResponse {
    let days = days_since_genesis(date);
    ModelResponse {
        date,
        days_since_genesis: days,
        model: model_output(days),
    }
}

async fn position_handler(query: Result<Query<PositionQuery>, QueryRejection>) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    match position_reply(query, today()) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(msg) => bad_request(&msg),
    }
}

fn position_reply(query: PositionQuery, today: NaiveDate) -> Result<PositionResponse, String> {
    let price_usd = query
        .price
        .filter(|p| p.is_finite())
        .ok_or_else(|| "Query parameter `price` must be a finite number".to_string())?;
    let date = query.date.unwrap_or(today);
    let days = days_since_genesis(date);
    let model = model_output(days);
    Ok(PositionResponse {
        date,
        days_since_genesis: days,
        price_usd,
        model,
        position: assess_position(price_usd, model),
    })
}

async fn snapshot_handler(payload: Result<Json<SnapshotRequest>, JsonRejection>) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    json_response(StatusCode::OK, snapshot_reply(request, today()))
}

fn snapshot_reply(request: SnapshotRequest, today: NaiveDate) -> SnapshotOutcome {
    market_snapshot(
        &request.daily,
        &request.weekly,
        request.current_price_usd,
        request.exchange_rate.unwrap_or(DEFAULT_EXCHANGE_RATE),
        request.date.unwrap_or(today),
    )
}

async fn series_handler(payload: Result<Json<SeriesRequest>, JsonRejection>) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    match series_reply(&request) {
        Ok(series) => json_response(StatusCode::OK, series),
        Err(msg) => bad_request(&msg),
    }
}

fn series_reply(request: &SeriesRequest) -> Result<Vec<ModelSeriesPoint>, String> {
    let horizon = series_horizon();
    if request.until > horizon {
        return Err(format!("`until` must not be later than {horizon}"));
    }
    Ok(build_model_series(
        &request.history,
        request.until,
        request.step_days.unwrap_or(DEFAULT_SERIES_STEP_DAYS),
    ))
}

async fn r_squared_handler(payload: Result<Json<RSquaredRequest>, JsonRejection>) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    json_response(
        StatusCode::OK,
        RSquaredResponse {
            r_squared: r_squared(&request.series),
        },
    )
}

async fn accumulation_get_handler(
    form: Result<Query<AccumulationForm>, QueryRejection>,
) -> Response {
    match form {
        Ok(Query(form)) => accumulation_handler_impl(form),
        Err(rejection) => bad_request(&rejection.body_text()),
    }
}

async fn accumulation_post_handler(
    form: Result<Json<AccumulationForm>, JsonRejection>,
) -> Response {
    match form {
        Ok(Json(form)) => accumulation_handler_impl(form),
        Err(rejection) => bad_request(&rejection.body_text()),
    }
}

fn accumulation_handler_impl(form: AccumulationForm) -> Response {
    let (status, body) = accumulation_reply(&form, today().year());
    json_response(status, body)
}

fn accumulation_reply(
    form: &AccumulationForm,
    current_year: i32,
) -> (StatusCode, SimulationOutcome<AccumulationRow>) {
    let outcome = run_accumulation(form, current_year);
    (outcome_status(&outcome), outcome)
}

async fn drawdown_get_handler(form: Result<Query<WithdrawalForm>, QueryRejection>) -> Response {
    match form {
        Ok(Query(form)) => drawdown_handler_impl(form),
        Err(rejection) => bad_request(&rejection.body_text()),
    }
}

async fn drawdown_post_handler(form: Result<Json<WithdrawalForm>, JsonRejection>) -> Response {
    match form {
        Ok(Json(form)) => drawdown_handler_impl(form),
        Err(rejection) => bad_request(&rejection.body_text()),
    }
}

fn drawdown_handler_impl(form: WithdrawalForm) -> Response {
    let (status, body) = drawdown_reply(&form, today().year());
    json_response(status, body)
}

fn drawdown_reply(form: &WithdrawalForm, base_year: i32) -> (StatusCode, DrawdownResponse) {
    let outcome = run_drawdown(form, base_year);
    let summary = outcome
        .is_success()
        .then(|| DrawdownSummary::from_rows(&outcome.rows, base_year));
    if let Some(DrawdownSummary {
        depletion_year: Some(year),
        ..
    }) = summary
    {
        info!(depletion_year = year, "drawdown depletes before horizon");
    }
    (outcome_status(&outcome), DrawdownResponse { outcome, summary })
}

fn outcome_status<R>(outcome: &SimulationOutcome<R>) -> StatusCode {
    if outcome.is_success() {
        StatusCode::OK
    } else {
        warn!(fields = ?outcome.errors.keys().collect::<Vec<_>>(), "simulation rejected");
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn bad_request(msg: &str) -> Response {
    warn!(error = msg, "rejected malformed request");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn accumulation_form_from_json(json: &str) -> AccumulationForm {
        serde_json::from_str(json).expect("valid accumulation payload")
    }

    fn withdrawal_form_from_json(json: &str) -> WithdrawalForm {
        serde_json::from_str(json).expect("valid withdrawal payload")
    }

    #[test]
    fn model_reply_flattens_model_values() {
        let body = serde_json::to_value(model_reply(date(2025, 1, 1))).expect("serializes");
        assert_eq!(body["date"], json!("2025-01-01"));
        assert_eq!(body["daysSinceGenesis"], json!(5842));
        assert!(body["medianUSD"].as_f64().expect("median") > body["supportUSD"].as_f64().expect("support"));
    }

    #[test]
    fn position_reply_requires_a_finite_price() {
        let missing = PositionQuery {
            price: None,
            date: None,
        };
        assert!(position_reply(missing, date(2025, 1, 1)).is_err());

        let query = PositionQuery {
            price: Some(100_000.0),
            date: Some(date(2025, 1, 1)),
        };
        let reply = position_reply(query, date(2030, 1, 1)).expect("valid");
        assert_eq!(reply.date, date(2025, 1, 1));
        assert!(reply.position.relative_position_pct.is_some());
        let body = serde_json::to_value(&reply).expect("serializes");
        assert!(body["position"]["label"].is_string());
        assert!(body["position"]["color"].as_str().expect("color").starts_with('#'));
    }

    #[test]
    fn snapshot_request_without_history_reports_no_data() {
        let request: SnapshotRequest =
            serde_json::from_str(r#"{"history": [], "currentPriceUsd": 95000}"#).expect("parses");
        let body = serde_json::to_value(snapshot_reply(request, date(2025, 6, 1))).expect("serializes");
        assert_eq!(body["status"], json!("no-data"));
    }

    #[test]
    fn snapshot_request_splits_daily_and_weekly_prices() {
        let request: SnapshotRequest = serde_json::from_str(
            r#"{
                "daily": [
                    {"date": "2025-05-30T00:00:00Z", "price": 90000},
                    {"date": "2025-05-31T00:00:00Z", "price": 100000}
                ],
                "weeklyPrices": [
                    {"date": "2021-01-04T00:00:00Z", "price": 32000},
                    {"date": "2023-01-02T00:00:00Z", "price": 16700},
                    {"date": "2025-01-06T00:00:00Z", "price": 102000}
                ],
                "currentPriceUsd": 99000,
                "exchangeRate": 140
            }"#,
        )
        .expect("parses");
        let body = serde_json::to_value(snapshot_reply(request, date(2025, 6, 1))).expect("serializes");
        assert_eq!(body["status"], json!("ready"));
        let change = body["change24hPct"].as_f64().expect("change");
        assert!((change - 10.0).abs() < 1e-9);
        let fit = body["rSquared"].as_f64().expect("r squared");
        assert!(fit > 0.0 && fit <= 1.0);
    }

    #[test]
    fn series_reply_uses_default_step() {
        let request: SeriesRequest =
            serde_json::from_str(r#"{"until": "2025-03-01"}"#).expect("parses");
        let series = series_reply(&request).expect("within horizon");
        assert!(!series.is_empty());
        assert!(series.iter().all(|p| p.is_future && p.price.is_none()));
        assert!(series.windows(2).all(|w| w[1].days_since_genesis - w[0].days_since_genesis == 30));
    }

    #[test]
    fn series_beyond_horizon_is_rejected() {
        let request: SeriesRequest =
            serde_json::from_str(r#"{"until": "9999-12-31", "stepDays": 1}"#).expect("parses");
        let err = series_reply(&request).expect_err("must reject far-future horizon");
        assert!(err.contains("2050-12-31"));

        let at_horizon: SeriesRequest =
            serde_json::from_str(r#"{"until": "2050-12-31", "stepDays": 365}"#).expect("parses");
        assert!(series_reply(&at_horizon).is_ok());
    }

    #[test]
    fn accumulation_payload_uses_web_field_names() {
        let form = accumulation_form_from_json(
            r#"{
                "initialHoldingKind": "fiat",
                "initialFiatAmount": "1000000",
                "monthlyContribution": "30000",
                "years": "10",
                "priceModel": "conservative",
                "exchangeRate": "150",
                "inflationRate": "2"
            }"#,
        );
        let (status, outcome) = accumulation_reply(&form, 2026);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome.rows.first().map(|r| r.year), Some(2026));
        assert_eq!(outcome.rows.last().map(|r| r.year), Some(2050));

        let body = serde_json::to_value(&outcome).expect("serializes");
        let first = &body["rows"][0];
        for key in [
            "year",
            "btcPriceFiat",
            "annualContributionFiat",
            "btcPurchased",
            "cumulativeBtcHeld",
            "totalValueFiat",
            "isContributionPeriod",
        ] {
            assert!(first.get(key).is_some(), "missing {key}");
        }
        assert_eq!(body["errors"], json!({}));
    }

    #[test]
    fn invalid_accumulation_is_unprocessable_with_field_keys() {
        let form = accumulation_form_from_json(
            r#"{"initialBtcHolding": "-1", "monthlyContribution": "abc", "years": "51"}"#,
        );
        let (status, outcome) = accumulation_reply(&form, 2026);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let body = serde_json::to_value(&outcome).expect("serializes");
        assert_eq!(body["rows"], json!([]));
        for key in ["initialBtcHolding", "monthlyContribution", "years", "exchangeRate"] {
            assert!(body["errors"].get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn unknown_price_model_is_a_parse_error() {
        let parsed = serde_json::from_str::<AccumulationForm>(r#"{"priceModel": "optimistic"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn drawdown_payload_accepts_legacy_keys_and_adds_summary() {
        let form = withdrawal_form_from_json(
            r#"{
                "initialBTC": "0.5",
                "startYear": "2026",
                "withdrawalType": "fixed",
                "withdrawalAmount": "5000000",
                "showSecondPhase": true,
                "secondPhaseYear": "2030",
                "secondPhaseType": "percentage",
                "secondPhaseRate": "4",
                "taxRate": "20.315",
                "exchangeRate": "150",
                "inflationRate": "0"
            }"#,
        );
        let (status, response) = drawdown_reply(&form, 2026);
        assert_eq!(status, StatusCode::OK);
        let body = serde_json::to_value(&response).expect("serializes");
        assert_eq!(body["rows"][0]["phaseLabel"], json!("phase-1"));
        assert_eq!(body["rows"][0]["mode"], json!("fixed"));
        let phase_two = body["rows"]
            .as_array()
            .expect("rows")
            .iter()
            .find(|row| row["year"] == json!(2030))
            .expect("row for 2030");
        assert_eq!(phase_two["phaseLabel"], json!("phase-2"));
        assert!(body["summary"].is_object());
        assert!(body["summary"].get("depletionYear").is_some());
    }

    #[test]
    fn drawdown_errors_omit_summary() {
        let form = withdrawal_form_from_json(r#"{"initialBtc": "0", "startYear": "1999"}"#);
        let (status, response) = drawdown_reply(&form, 2026);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.summary.is_none());
        assert!(response.outcome.errors.contains_key("initialBtc"));
        assert!(response.outcome.errors.contains_key("startYear"));
    }

    #[test]
    fn error_response_sets_no_store() {
        let response = error_response(StatusCode::NOT_FOUND, "Not found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
    }

    #[test]
    fn simulation_year_follows_the_model_date() {
        let form = accumulation_form_from_json(
            r#"{"initialBtcHolding": "1", "monthlyContribution": "0", "years": "1", "exchangeRate": "150", "inflationRate": "0"}"#,
        );
        let date = today();
        let (_, outcome) = accumulation_reply(&form, date.year());
        assert_eq!(outcome.rows.first().map(|r| r.year), Some(date.year()));
    }

    #[test]
    fn router_builds() {
        let _: Router = router();
    }

    #[test]
    fn json_value_round_trip_of_r_squared_request() {
        let request: RSquaredRequest = serde_json::from_value(json!({
            "series": [{"timestamp": "2020-01-01T00:00:00Z", "price": 7200.0}]
        }))
        .expect("parses");
        let body: Value = serde_json::to_value(RSquaredResponse {
            r_squared: r_squared(&request.series),
        })
        .expect("serializes");
        assert_eq!(body["rSquared"], json!(0.0));
    }
}
