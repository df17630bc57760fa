use rust_decimal::Decimal;
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use std::str::FromStr;

use crate::database::models::{JenisTransaksi, Rekap, Transaksi, TransaksiFilter};

/*
Read-only queries over the UMKM transaction tables.
Every filter value goes through push_bind, never into the SQL text.
 */

/*==========Filter composition=========== */

fn push_filters(qb: &mut QueryBuilder<'static, Sqlite>, filter: &TransaksiFilter, with_jenis: bool) {
    qb.push(" WHERE t.id_umkm = ").push_bind(filter.id_umkm);

    // date() so rows stored with a time part still match their calendar day
    if let Some(mulai) = filter.tanggal_mulai {
        qb.push(" AND date(t.tanggal_transaksi) >= ").push_bind(mulai);
    }
    if let Some(selesai) = filter.tanggal_selesai {
        qb.push(" AND date(t.tanggal_transaksi) <= ").push_bind(selesai);
    }
    if with_jenis {
        if let Some(jenis) = filter.jenis {
            qb.push(" AND kt.jenis = ").push_bind(jenis.as_str());
        }
    }
}

/*==========Transaction Queries=========== */

pub fn transaksi_query(filter: &TransaksiFilter) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(
        r#"
        SELECT
            t.id_transaksi,
            t.id_umkm,
            t.id_kategori,
            CAST(t.jumlah AS TEXT)            AS jumlah,
            CAST(t.tanggal_transaksi AS TEXT) AS tanggal_transaksi,
            t.keterangan,
            t.created_by,
            kt.nama_kategori,
            kt.jenis,
            u.nama AS created_by_name
        FROM transaksi t
        LEFT JOIN kategori_transaksi kt ON t.id_kategori = kt.id_kategori
        LEFT JOIN users u ON t.created_by = u.id_user
        "#,
    );
    push_filters(&mut qb, filter, true);
    qb.push(" ORDER BY t.tanggal_transaksi DESC, t.id_transaksi DESC");
    qb
}

// Get all transactions of one UMKM, most recent first
pub async fn get_transaksi_by_umkm(
    pool: &Pool<Sqlite>,
    filter: &TransaksiFilter,
) -> Result<Vec<Transaksi>, sqlx::Error> {
    let mut qb = transaksi_query(filter);

    qb.build()
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| {
            let jumlah_text: String = row.try_get("jumlah")?;

            Ok(Transaksi {
                id_transaksi: row.try_get("id_transaksi")?,
                id_umkm: row.try_get("id_umkm")?,
                id_kategori: row.try_get("id_kategori")?,
                jumlah: parse_amount(&jumlah_text)?,
                tanggal_transaksi: row.try_get("tanggal_transaksi")?,
                keterangan: row.try_get("keterangan")?,
                created_by: row.try_get("created_by")?,
                nama_kategori: row.try_get("nama_kategori")?,
                jenis: row.try_get("jenis")?,
                created_by_name: row.try_get("created_by_name")?,
            })
        })
        .collect::<Result<Vec<Transaksi>, sqlx::Error>>()
}

// SQLite renders large REAL values in exponent form
fn parse_amount(text: &str) -> Result<Decimal, sqlx::Error> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| sqlx::Error::Decode(format!("Invalid Decimal format for jumlah: {}", e).into()))
}

/*==========Report Queries=========== */

pub fn rekap_query(filter: &TransaksiFilter) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new("SELECT CAST(COALESCE(SUM(CASE WHEN kt.jenis = ");
    qb.push_bind(JenisTransaksi::Pemasukan.as_str());
    qb.push(" THEN t.jumlah ELSE 0 END), 0) AS REAL) AS total_pemasukan, CAST(COALESCE(SUM(CASE WHEN kt.jenis = ");
    qb.push_bind(JenisTransaksi::Pengeluaran.as_str());
    qb.push(
        r#" THEN t.jumlah ELSE 0 END), 0) AS REAL) AS total_pengeluaran
        FROM transaksi t
        LEFT JOIN kategori_transaksi kt ON t.id_kategori = kt.id_kategori"#,
    );
    push_filters(&mut qb, filter, false);
    qb
}

// Income/expense totals in a single aggregate pass; zeros when nothing matches
pub async fn get_rekap_by_umkm(
    pool: &Pool<Sqlite>,
    filter: &TransaksiFilter,
) -> Result<Rekap, sqlx::Error> {
    let mut qb = rekap_query(filter);
    let row = qb.build().fetch_optional(pool).await?;

    let Some(row) = row else {
        return Ok(Rekap::default());
    };
    let pemasukan: Option<f64> = row.try_get("total_pemasukan")?;
    let pengeluaran: Option<f64> = row.try_get("total_pengeluaran")?;

    Ok(Rekap::from_totals(
        pemasukan.unwrap_or(0.0),
        pengeluaran.unwrap_or(0.0),
    ))
}
