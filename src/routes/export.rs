use axum::Json;
use axum::http::header;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::pipeline::csv::trade_data_csv;
use crate::pipeline::normalize::TradeRecord;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBody {
    #[serde(default)]
    pub trade_data: Vec<TradeRecord>,
}

/// Render a report's trade rows as a downloadable CSV. The rows come back
/// from the client because reports are never stored server-side.
pub async fn export_trade_csv(Json(body): Json<ExportBody>) -> impl IntoResponse {
    let csv = trade_data_csv(&body.trade_data);

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"trade_data_export.csv\"",
            ),
        ],
        csv,
    )
}
