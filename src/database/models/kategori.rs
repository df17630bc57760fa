use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// `kategori_transaksi.jenis`: every category is either income or expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JenisTransaksi {
    Pemasukan,
    Pengeluaran,
}

impl JenisTransaksi {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pemasukan => "pemasukan",
            Self::Pengeluaran => "pengeluaran",
        }
    }
}

impl FromStr for JenisTransaksi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pemasukan" => Ok(Self::Pemasukan),
            "pengeluaran" => Ok(Self::Pengeluaran),
            other => Err(format!("unknown jenis: {}", other)),
        }
    }
}
