use axum::{
    routing::{get, post},
    Router,
};
use crate::backend::{handlers, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/predict/pemasukan", post(handlers::predict_pemasukan))
        .route("/predict/pengeluaran", post(handlers::predict_pengeluaran))
        .route("/transaksi/umkm/:id_umkm", get(handlers::transaksi_by_umkm))
        .route("/laporan/rekap/umkm/:id_umkm", get(handlers::rekap_by_umkm))
}
