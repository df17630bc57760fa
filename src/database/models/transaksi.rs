use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::JenisTransaksi;

/// One `transaksi` row joined with its category and creator for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaksi {
    pub id_transaksi: i64,
    pub id_umkm: i64,
    pub id_kategori: Option<i64>,
    #[serde(with = "rust_decimal::serde::float")]
    pub jumlah: Decimal,
    pub tanggal_transaksi: String, // kept as stored text
    pub keterangan: Option<String>,
    pub created_by: Option<i64>,
    pub nama_kategori: Option<String>,
    pub jenis: Option<String>,
    pub created_by_name: Option<String>,
}

/// Filters shared by the transaction list and the recap. Date bounds are
/// inclusive and apply independently; `jenis` is ignored by the recap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransaksiFilter {
    pub id_umkm: i64,
    pub tanggal_mulai: Option<NaiveDate>,
    pub tanggal_selesai: Option<NaiveDate>,
    pub jenis: Option<JenisTransaksi>,
}

impl TransaksiFilter {
    pub fn for_umkm(id_umkm: i64) -> Self {
        Self {
            id_umkm,
            tanggal_mulai: None,
            tanggal_selesai: None,
            jenis: None,
        }
    }
}
