pub mod kategori;
pub mod rekap;
pub mod transaksi;

pub use kategori::JenisTransaksi;
pub use rekap::Rekap;
pub use transaksi::{Transaksi, TransaksiFilter};
