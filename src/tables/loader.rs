//! CSV-based table loader
//!
//! Thin adapter between table files and the in-memory shapes the core works
//! on. The expected directory layout is one file per sheet of the legacy
//! workbook: `tariff.csv`, `lx.csv` (flat tables) or `generation.csv`
//! (generation tables), `hx.csv`, `adjustments.csv` and optionally
//! `ukv.csv`.

use std::error::Error;
use std::fs::File;
use std::path::Path;

use super::{
    AdjustmentEntry, AdjustmentRegistry, ByGender, ExchangeRow, ExchangeTable, Gender,
    HazardTable, InsuranceClass, MortalityModel, QxSurface, TableSet, TariffParams, MAX_AGE,
};

/// Default path to the table directory
pub const DEFAULT_TABLES_PATH: &str = "data/tables";

/// Tariff sheet: one row of scalar parameters
struct TariffSheet {
    is_flat: bool,
    params: TariffParams,
}

fn load_tariff(path: &Path) -> Result<TariffSheet, Box<dyn Error>> {
    let file = File::open(path.join("tariff.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut rows = reader.records();
    let record = rows.next().ok_or("tariff.csv has no data row")??;
    if rows.next().is_some() {
        return Err("tariff.csv must contain exactly one row".into());
    }

    // Columns: name, is_flat, delta, round
    let is_flat: u8 = record[1].parse()?;
    let delta: i32 = record[2].parse()?;
    let round_decimals: u32 = record[3].parse()?;

    Ok(TariffSheet {
        is_flat: is_flat != 0,
        params: TariffParams {
            delta,
            round_decimals,
        },
    })
}

/// Load flat lx columns from `lx.csv` (gender, age, lx)
fn load_flat_lx(path: &Path) -> Result<MortalityModel, Box<dyn Error>> {
    let file = File::open(path.join("lx.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let rows = (MAX_AGE + 1) as usize;
    let mut columns = ByGender::new(vec![0.0; rows], vec![0.0; rows]);

    for result in reader.records() {
        let record = result?;
        let gender = Gender::parse(&record[0])?;
        let age: usize = record[1].parse()?;
        let lx: f64 = record[2].parse()?;

        let column = match gender {
            Gender::Male => &mut columns.male,
            Gender::Female => &mut columns.female,
        };
        if age < column.len() {
            column[age] = lx;
        }
    }

    Ok(MortalityModel::flat(columns.male, columns.female)?)
}

/// Load a generation qx surface from `generation.csv` (gender, age, year, qx)
/// and flatten it for `calc_year`
fn load_generation(path: &Path, calc_year: i32) -> Result<MortalityModel, Box<dyn Error>> {
    let file = File::open(path.join("generation.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut cells: Vec<(Gender, usize, i32, f64)> = Vec::new();
    for result in reader.records() {
        let record = result?;
        cells.push((
            Gender::parse(&record[0])?,
            record[1].parse()?,
            record[2].parse()?,
            record[3].parse()?,
        ));
    }
    if cells.is_empty() {
        return Err("generation.csv has no data rows".into());
    }

    let start_year = cells.iter().map(|c| c.2).min().unwrap_or(0);
    let end_year = cells.iter().map(|c| c.2).max().unwrap_or(0);
    let years = (end_year - start_year + 1) as usize;

    let surface = |gender: Gender| -> Result<QxSurface, Box<dyn Error>> {
        let mut rates = vec![vec![f64::NAN; years]; (MAX_AGE + 1) as usize];
        for (g, age, year, qx) in cells.iter().filter(|c| c.0 == gender) {
            if *age < rates.len() {
                rates[*age][(*year - start_year) as usize] = *qx;
            }
        }
        if rates.iter().flatten().any(|q| q.is_nan()) {
            return Err(format!("generation.csv surface for {gender} is incomplete").into());
        }
        Ok(QxSurface::new(start_year, rates)?)
    };

    let male = surface(Gender::Male)?;
    let female = surface(Gender::Female)?;
    Ok(MortalityModel::generation(&male, &female, calc_year)?)
}

/// Load hx rates from `hx.csv` (gender, age, hx)
fn load_hazard(path: &Path) -> Result<HazardTable, Box<dyn Error>> {
    let file = File::open(path.join("hx.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let rows = (MAX_AGE + 1) as usize;
    let mut columns = ByGender::new(vec![0.0; rows], vec![0.0; rows]);

    for result in reader.records() {
        let record = result?;
        let gender = Gender::parse(&record[0])?;
        let age: usize = record[1].parse()?;
        let hx: f64 = record[2].parse()?;

        let column = match gender {
            Gender::Male => &mut columns.male,
            Gender::Female => &mut columns.female,
        };
        if age < column.len() {
            column[age] = hx;
        }
    }

    Ok(HazardTable::new(columns.male, columns.female))
}

/// Load adjustment rows from `adjustments.csv`
/// (gender, insurance_type, CX1, CX2, CX3, fnett, fcorr, fOTS)
fn load_adjustments(path: &Path) -> Result<AdjustmentRegistry, Box<dyn Error>> {
    let file = File::open(path.join("adjustments.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut registry = AdjustmentRegistry::new();
    for result in reader.records() {
        let record = result?;
        let gender = Gender::parse(&record[0])?;
        let class = InsuranceClass::parse(&record[1])?;
        let cx3 = match record[4].trim() {
            "" => None,
            value => Some(value.parse()?),
        };
        registry.insert(
            gender,
            class,
            AdjustmentEntry {
                cx1: record[2].parse()?,
                cx2: record[3].parse()?,
                cx3,
                fnett: record[5].parse()?,
                fcorr: record[6].parse()?,
                f_ots: record[7].parse()?,
            },
        );
    }

    Ok(registry)
}

/// Load benefit-exchange rows from `ukv.csv`
/// (gender, pension_age, intrest, hx); the file is optional
fn load_exchange(path: &Path) -> Result<Option<ExchangeTable>, Box<dyn Error>> {
    let file_path = path.join("ukv.csv");
    if !file_path.exists() {
        return Ok(None);
    }
    let file = File::open(file_path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(ExchangeRow {
            gender: Gender::parse(&record[0])?,
            pension_age: record[1].parse()?,
            rate: record[2].parse()?,
            hx: record[3].parse()?,
        });
    }
    Ok(Some(ExchangeTable::new(rows)))
}

/// Load a complete table set from a directory. `calc_year` is only consulted
/// for generation tables.
pub fn load_table_set(path: &Path, calc_year: i32) -> Result<TableSet, Box<dyn Error>> {
    let tariff = load_tariff(path)?;
    let mortality = if tariff.is_flat {
        load_flat_lx(path)?
    } else {
        load_generation(path, calc_year)?
    };

    Ok(TableSet {
        mortality,
        hazard: load_hazard(path)?,
        adjustments: load_adjustments(path)?,
        exchange: load_exchange(path)?,
        tariff: tariff.params,
    })
}
