use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::product::Product;

use super::Catalog;

/// Catalog files probed under the data directory, in preference order.
pub const CANDIDATE_FILES: &[&str] =
    &["catalogo_normalizado_2025.csv", "catalog.csv", "catalog.json"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog csv `{path}`: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("could not parse catalog json `{path}`: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
}

/// Loads the first candidate catalog file found under `data_dir`. A missing
/// file is an empty catalog, not an error; the service can still boot and
/// reload later.
pub fn load_from_dir(
    data_dir: &Path,
    default_deposit_rate: Decimal,
) -> Result<Catalog, CatalogError> {
    for candidate in CANDIDATE_FILES {
        let path = data_dir.join(candidate);
        if path.exists() {
            return load_file(&path, default_deposit_rate);
        }
    }
    Ok(Catalog::default())
}

pub fn load_file(path: &Path, default_deposit_rate: Decimal) -> Result<Catalog, CatalogError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CatalogError::Read { path: path.to_path_buf(), source })?;
    let text = raw.strip_prefix('\u{feff}').unwrap_or(&raw);

    let products = if path.extension().is_some_and(|ext| ext == "json") {
        parse_json(text, default_deposit_rate)
            .map_err(|source| CatalogError::Json { path: path.to_path_buf(), source })?
    } else {
        parse_csv(text, default_deposit_rate)
            .map_err(|source| CatalogError::Csv { path: path.to_path_buf(), source })?
    };

    Ok(Catalog::new(products))
}

fn parse_csv(text: &str, default_deposit_rate: Decimal) -> Result<Vec<Product>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(text.as_bytes());
    let mut products = Vec::new();
    for row in reader.deserialize::<HashMap<String, String>>() {
        if let Some(product) = normalize_row(&row?, default_deposit_rate) {
            products.push(product);
        }
    }
    Ok(products)
}

fn parse_json(text: &str, default_deposit_rate: Decimal) -> Result<Vec<Product>, serde_json::Error> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(text)?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            let object = row.as_object()?;
            let flat: HashMap<String, String> = object
                .iter()
                .map(|(key, value)| {
                    let text = match value {
                        serde_json::Value::String(s) => s.clone(),
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (key.clone(), text)
                })
                .collect();
            normalize_row(&flat, default_deposit_rate)
        })
        .collect())
}

/// Builds a product from a raw row, tolerating the header aliases seen in
/// historical catalog exports. Returns `None` for inactive rows.
fn normalize_row(row: &HashMap<String, String>, default_deposit_rate: Decimal) -> Option<Product> {
    let sku = field(row, &["sku", "SKU"]).unwrap_or_default().trim().to_owned();
    let name = fix_accents(
        field(row, &["name", "Nombre", "descripcion", "description"]).unwrap_or_default().trim(),
    );
    let category = fix_accents(field(row, &["category", "Categoria"]).unwrap_or_default().trim());
    let mut section = fix_accents(
        field(row, &["section", "seccion", "section_name", "sectionName"])
            .unwrap_or_default()
            .trim(),
    );
    let description =
        fix_accents(field(row, &["desc", "Descripcion", "description"]).unwrap_or_default().trim());
    let image_url = field(row, &["imageUrl", "image_url", "image", "img", "imagen", "url"])
        .unwrap_or_default()
        .trim()
        .to_owned();

    let daily_price =
        parse_decimal(field(row, &["dailyPrice", "price", "Precio"])).unwrap_or(Decimal::ZERO);
    let deposit_rate = parse_decimal(field(row, &["depositRate", "Deposito", "deposit"]))
        .unwrap_or(default_deposit_rate);

    // Sections were sometimes only encoded in the category column.
    if section.is_empty() {
        let lowered = category.to_lowercase();
        if ["corporativo", "social", "todos", "ambos", "all"]
            .iter()
            .any(|marker| lowered.contains(marker))
        {
            section = lowered;
        }
    }

    let active = parse_bool(field(row, &["active", "Activo"]), true);
    if !active {
        return None;
    }
    let discountable = parse_bool(field(row, &["discountable", "Descuento"]), true);

    Some(Product {
        sku,
        name,
        category,
        section,
        description,
        image_url,
        daily_price,
        deposit_rate,
        active,
        discountable,
    })
}

fn field<'a>(row: &'a HashMap<String, String>, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .find_map(|alias| row.get(*alias))
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
}

fn parse_decimal(value: Option<&str>) -> Option<Decimal> {
    value.and_then(|v| v.trim().parse::<Decimal>().ok())
}

/// Empty means "use the default"; otherwise only a known falsy marker turns
/// the flag off.
fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_lowercase()) {
        None => default,
        Some(s) if s.is_empty() => default,
        Some(s) => !matches!(s.as_str(), "0" | "false" | "no" | "inactive" | "inactivo" | "f" | "off"),
    }
}

/// Repairs the mojibake produced by a legacy Windows-1252 export where
/// accented capital A was written as cedilla: `LçMPARA` -> `LÁMPARA`,
/// `Ç` -> `Á`, remaining `ç` -> `á`.
pub fn fix_accents(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut output = String::with_capacity(input.len());
    for (index, &ch) in chars.iter().enumerate() {
        match ch {
            'ç' => {
                let prev_upper =
                    index > 0 && chars[index - 1].is_alphabetic() && chars[index - 1].is_uppercase();
                let next_upper = chars
                    .get(index + 1)
                    .is_some_and(|next| next.is_alphabetic() && next.is_uppercase());
                output.push(if prev_upper && next_upper { 'Á' } else { 'á' });
            }
            'Ç' => output.push('Á'),
            other => output.push(other),
        }
    }
    output
}
