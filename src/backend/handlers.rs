// src/backend/handlers.rs
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::backend::{ApiError, AppState};
use crate::database::db::queries;
use crate::database::models::{JenisTransaksi, Rekap, Transaksi, TransaksiFilter};
use crate::forecast::{Forecast, ForecastError, Signal};

/* ==========Prediction=========== */

pub async fn predict_pemasukan(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Forecast>, ApiError> {
    predict(&state, Signal::Pemasukan, payload)
}

pub async fn predict_pengeluaran(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Forecast>, ApiError> {
    predict(&state, Signal::Pengeluaran, payload)
}

fn predict(
    state: &AppState,
    signal: Signal,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Forecast>, ApiError> {
    let pipeline = state
        .forecasts
        .pipeline(signal)
        .ok_or_else(|| ApiError::Unavailable(signal.unavailable_message()))?;

    // A missing or unparsable body is reported the same way as a missing key.
    let body = match payload {
        Ok(Json(value)) => Some(value),
        Err(rejection) => {
            tracing::debug!(signal = signal.as_str(), %rejection, "rejected forecast body");
            None
        }
    };

    match pipeline.predict_json(body.as_ref()) {
        Ok(forecast) => Ok(Json(forecast)),
        Err(ForecastError::InvalidInput(msg)) => Err(ApiError::BadRequest(msg)),
        Err(e) => Err(ApiError::internal(signal.internal_error_message(), e)),
    }
}

/* ==========Transactions & reports=========== */

#[derive(Debug, Default, Deserialize)]
pub struct TransaksiParams {
    pub tanggal_mulai: Option<String>,
    pub tanggal_selesai: Option<String>,
    pub jenis: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RekapParams {
    pub tanggal_mulai: Option<String>,
    pub tanggal_selesai: Option<String>,
}

pub async fn transaksi_by_umkm(
    State(state): State<AppState>,
    id_umkm: Result<Path<i64>, PathRejection>,
    params: Result<Query<TransaksiParams>, QueryRejection>,
) -> Result<Json<Vec<Transaksi>>, ApiError> {
    let params = query_params(params)?;
    let filter = TransaksiFilter {
        tanggal_mulai: parse_date("tanggal_mulai", params.tanggal_mulai.as_deref())?,
        tanggal_selesai: parse_date("tanggal_selesai", params.tanggal_selesai.as_deref())?,
        jenis: parse_jenis(params.jenis.as_deref())?,
        ..TransaksiFilter::for_umkm(umkm_id(id_umkm)?)
    };

    let rows = queries::get_transaksi_by_umkm(&state.db, &filter)
        .await
        .map_err(|e| {
            ApiError::internal("Terjadi kesalahan internal saat mengambil data transaksi.", e)
        })?;

    Ok(Json(rows))
}

pub async fn rekap_by_umkm(
    State(state): State<AppState>,
    id_umkm: Result<Path<i64>, PathRejection>,
    params: Result<Query<RekapParams>, QueryRejection>,
) -> Result<Json<Rekap>, ApiError> {
    let params = query_params(params)?;
    let filter = TransaksiFilter {
        tanggal_mulai: parse_date("tanggal_mulai", params.tanggal_mulai.as_deref())?,
        tanggal_selesai: parse_date("tanggal_selesai", params.tanggal_selesai.as_deref())?,
        ..TransaksiFilter::for_umkm(umkm_id(id_umkm)?)
    };

    let rekap = queries::get_rekap_by_umkm(&state.db, &filter)
        .await
        .map_err(|e| ApiError::internal("Terjadi kesalahan internal saat membuat laporan.", e))?;

    Ok(Json(rekap))
}

fn umkm_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::BadRequest("id_umkm harus berupa angka".into()))
}

// Repeated keys and the like fail before the handler body; the serde message names the key.
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query.map(|Query(params)| params).map_err(|rejection| {
        tracing::debug!(%rejection, "rejected query string");
        ApiError::BadRequest(format!("Parameter query tidak valid: {}", rejection.body_text()))
    })
}

// Empty query values count as "not given".
fn parse_date(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                ApiError::BadRequest(format!("Parameter \"{}\" harus berformat YYYY-MM-DD", name))
            }),
    }
}

fn parse_jenis(raw: Option<&str>) -> Result<Option<JenisTransaksi>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|_| {
            ApiError::BadRequest(
                "Parameter \"jenis\" harus bernilai \"pemasukan\" atau \"pengeluaran\"".into(),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    #[test]
    fn blank_params_are_ignored() {
        assert_eq!(parse_date("tanggal_mulai", None).unwrap(), None);
        assert_eq!(parse_date("tanggal_mulai", Some("  ")).unwrap(), None);
        assert_eq!(parse_jenis(Some("")).unwrap(), None);
    }

    #[test]
    fn bad_params_name_themselves() {
        let err = parse_date("tanggal_selesai", Some("31-01-2024")).unwrap_err();
        assert!(err.to_string().contains("tanggal_selesai"));

        let err = parse_jenis(Some("income")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(err.to_string().contains("jenis"));
    }

    #[test]
    fn repeated_query_keys_become_bad_requests() {
        let uri: Uri = "/transaksi/umkm/5?jenis=pemasukan&jenis=pengeluaran".parse().unwrap();
        let err = query_params(Query::<TransaksiParams>::try_from_uri(&uri)).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(err.to_string().contains("jenis"), "{}", err);

        let uri: Uri = "/laporan/rekap/umkm/5?tanggal_mulai=2024-01-01".parse().unwrap();
        let params = query_params(Query::<RekapParams>::try_from_uri(&uri)).unwrap();
        assert_eq!(params.tanggal_mulai.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn valid_params_parse() {
        assert_eq!(
            parse_date("tanggal_mulai", Some("2024-01-01")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(parse_jenis(Some("pengeluaran")).unwrap(), Some(JenisTransaksi::Pengeluaran));
    }
}
