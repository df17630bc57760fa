use serde::Serialize;

/// Income/expense totals for one UMKM over an optional date window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rekap {
    pub total_pemasukan: f64,
    pub total_pengeluaran: f64,
    pub saldo_bersih: f64,
}

impl Rekap {
    /// Net balance is always derived from the two totals.
    pub fn from_totals(total_pemasukan: f64, total_pengeluaran: f64) -> Self {
        Self {
            total_pemasukan,
            total_pengeluaran,
            saldo_bersih: total_pemasukan - total_pengeluaran,
        }
    }
}
