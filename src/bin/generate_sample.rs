use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};
use clap::Parser;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Write a synthetic DVF transaction file for trying out the dashboard.
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Args {
    /// Output file; `.csv` or `.parquet`
    #[arg(short, long, default_value = "dvf_2024.csv")]
    output: PathBuf,

    /// Number of rows to generate
    #[arg(short, long, default_value_t = 5000)]
    rows: usize,

    /// RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// (INSEE code, name, postal code, latitude, longitude, typical €/m²)
const MUNICIPALITIES: &[(&str, &str, &str, f64, f64, f64)] = &[
    ("23001", "Ahun", "23150", 46.0853, 2.0436, 850.0),
    ("23006", "Boussac", "23600", 46.3497, 2.2172, 700.0),
    ("23017", "Dun-le-Palestel", "23800", 46.3025, 1.6669, 750.0),
    ("23021", "Guéret", "23000", 46.1714, 1.8713, 1250.0),
    ("23026", "La Souterraine", "23300", 46.2378, 1.4869, 1050.0),
    ("23050", "Saint-Vaury", "23320", 46.2036, 1.7556, 950.0),
    ("23052", "La Souterraine", "23300", 46.2401, 1.4902, 1050.0),
    ("23096", "Bourganeuf", "23400", 45.9531, 1.7556, 800.0),
];

#[derive(Debug, Serialize)]
struct SampleRow {
    id_mutation: String,
    date_mutation: String,
    nature_mutation: &'static str,
    valeur_fonciere: Option<f64>,
    code_postal: String,
    code_commune: String,
    nom_commune: String,
    type_local: &'static str,
    surface_reelle_bati: Option<f64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Box-Muller transform for normal distribution
fn gauss<R: Rng>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

fn generate_row<R: Rng>(rng: &mut R, id: usize, year_start: NaiveDate) -> SampleRow {
    let &(code, name, postal, lat, lon, typical) =
        &MUNICIPALITIES[rng.gen_range(0..MUNICIPALITIES.len())];

    let roll: f64 = rng.gen();
    let type_local = match roll {
        r if r < 0.62 => "Maison",
        r if r < 0.82 => "Appartement",
        r if r < 0.94 => "Dépendance",
        _ => "Local industriel. commercial ou assimilé",
    };

    let surface = match type_local {
        "Appartement" => gauss(rng, 55.0, 18.0).max(12.0),
        "Maison" => gauss(rng, 95.0, 30.0).max(25.0),
        _ => gauss(rng, 40.0, 25.0).max(5.0),
    }
    .round();
    let price_per_m2 = gauss(rng, typical, typical * 0.35).max(50.0);
    let mut value = Some((surface * price_per_m2 / 100.0).round() * 100.0);
    let mut surface = Some(surface);
    let mut date = year_start
        .checked_add_days(Days::new(rng.gen_range(0..366)))
        .unwrap_or(year_start)
        .format("%Y-%m-%d")
        .to_string();

    // Sprinkle the defects real exports carry.
    match rng.gen_range(0..100) {
        0..=2 => value = None,
        3..=4 => value = Some(0.0),
        5..=6 => surface = None,
        7 => date = "n/a".to_string(),
        8 => value = value.map(|v| v * 40.0),
        _ => {}
    }
    let located = rng.gen_bool(0.9);

    SampleRow {
        id_mutation: format!("2024-{id}"),
        date_mutation: date,
        nature_mutation: "Vente",
        valeur_fonciere: value,
        code_postal: postal.to_string(),
        code_commune: code.to_string(),
        nom_commune: name.to_string(),
        type_local,
        surface_reelle_bati: surface,
        latitude: located.then(|| lat + gauss(rng, 0.0, 0.01)),
        longitude: located.then(|| lon + gauss(rng, 0.0, 0.01)),
    }
}

fn write_csv(path: &Path, rows: &[SampleRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    for row in rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[SampleRow]) -> Result<()> {
    let text = |f: fn(&SampleRow) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let number = |f: fn(&SampleRow) -> Option<f64>| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("id_mutation", DataType::Utf8, false),
        Field::new("date_mutation", DataType::Utf8, false),
        Field::new("nature_mutation", DataType::Utf8, false),
        Field::new("valeur_fonciere", DataType::Float64, true),
        Field::new("code_postal", DataType::Utf8, false),
        Field::new("code_commune", DataType::Utf8, false),
        Field::new("nom_commune", DataType::Utf8, false),
        Field::new("type_local", DataType::Utf8, false),
        Field::new("surface_reelle_bati", DataType::Float64, true),
        Field::new("latitude", DataType::Float64, true),
        Field::new("longitude", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            text(|r| r.id_mutation.as_str()),
            text(|r| r.date_mutation.as_str()),
            text(|r| r.nature_mutation),
            number(|r| r.valeur_fonciere),
            text(|r| r.code_postal.as_str()),
            text(|r| r.code_commune.as_str()),
            text(|r| r.nom_commune.as_str()),
            text(|r| r.type_local),
            number(|r| r.surface_reelle_bati),
            number(|r| r.latitude),
            number(|r| r.longitude),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let year_start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;

    let rows: Vec<SampleRow> = (0..args.rows)
        .map(|i| generate_row(&mut rng, i, year_start))
        .collect();

    let ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => write_csv(&args.output, &rows)?,
        "parquet" | "pq" => write_parquet(&args.output, &rows)?,
        other => bail!("Unsupported output extension: .{other}"),
    }

    println!("Wrote {} transactions to {}", rows.len(), args.output.display());
    Ok(())
}
