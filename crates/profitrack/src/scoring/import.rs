//! CSV loaders for the reference data the pipeline reads.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::domain::{Criterion, CriterionId, DomainError, Product, ProductId};
use super::memory::InMemoryStore;
use super::repository::RepositoryError;

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: usize, source: DomainError },
    Store { line: usize, source: RepositoryError },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read CSV file: {}", err),
            ImportError::Csv(err) => write!(f, "invalid CSV data: {}", err),
            ImportError::InvalidRow { line, source } => {
                write!(f, "line {}: {}", line, source)
            }
            ImportError::Store { line, source } => {
                write!(f, "line {}: could not store row: {}", line, source)
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::InvalidRow { source, .. } => Some(source),
            ImportError::Store { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct CriterionRow {
    id: u32,
    name: String,
    weight: f64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    id: u32,
    name: String,
    purchase_cost: i64,
    price_sale: i64,
    stock: u32,
    sold: u32,
    #[serde(default)]
    category: String,
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

// header occupies line 1
fn line_of(index: usize) -> usize {
    index + 2
}

/// Parses `id,name,weight,type` rows, validating the kind and weight of each.
pub fn read_criteria<R: Read>(reader: R) -> Result<Vec<Criterion>, ImportError> {
    let mut criteria = Vec::new();
    for (index, row) in csv_reader(reader).deserialize::<CriterionRow>().enumerate() {
        let row = row?;
        let invalid = |source| ImportError::InvalidRow {
            line: line_of(index),
            source,
        };
        let kind = row.kind.parse().map_err(invalid)?;
        let criterion =
            Criterion::new(CriterionId(row.id), row.name, row.weight, kind).map_err(invalid)?;
        criteria.push(criterion);
    }
    Ok(criteria)
}

/// Parses `id,name,purchase_cost,price_sale,stock,sold,category` rows.
pub fn read_products<R: Read>(reader: R) -> Result<Vec<Product>, ImportError> {
    let mut products = Vec::new();
    for (index, row) in csv_reader(reader).deserialize::<ProductRow>().enumerate() {
        let row = row?;
        if row.name.trim().is_empty() {
            return Err(ImportError::InvalidRow {
                line: line_of(index),
                source: DomainError::EmptyName,
            });
        }
        products.push(Product::new(
            ProductId(row.id),
            row.name,
            row.purchase_cost,
            row.price_sale,
            row.stock,
            row.sold,
            row.category,
        ));
    }
    Ok(products)
}

pub fn load_criteria_csv(
    path: impl AsRef<Path>,
    store: &InMemoryStore,
) -> Result<usize, ImportError> {
    let criteria = read_criteria(File::open(path)?)?;
    let count = criteria.len();
    for (index, criterion) in criteria.into_iter().enumerate() {
        store
            .insert_criterion(criterion)
            .map_err(|source| ImportError::Store {
                line: line_of(index),
                source,
            })?;
    }
    Ok(count)
}

pub fn load_products_csv(
    path: impl AsRef<Path>,
    store: &InMemoryStore,
) -> Result<usize, ImportError> {
    let products = read_products(File::open(path)?)?;
    let count = products.len();
    for (index, product) in products.into_iter().enumerate() {
        store
            .insert_product(product)
            .map_err(|source| ImportError::Store {
                line: line_of(index),
                source,
            })?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::domain::CriterionKind;
    use crate::scoring::repository::{CriteriaStore, ProductStore};
    use std::io::Cursor;

    #[test]
    fn reads_criteria_with_typed_kinds() {
        let data = "id,name,weight,type\n1,Return On Investment,0.3,Benefit\n2, Efficiency Ratio ,0.7,cost\n";
        let criteria = read_criteria(Cursor::new(data)).expect("criteria parse");

        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria[0].kind, CriterionKind::Benefit);
        assert_eq!(criteria[1].name, "Efficiency Ratio");
        assert_eq!(criteria[1].kind, CriterionKind::Cost);
    }

    #[test]
    fn rejects_unknown_kind_with_line_number() {
        let data = "id,name,weight,type\n1,ROI,0.3,benefit\n2,Efficiency,0.7,costly\n";
        let err = read_criteria(Cursor::new(data)).expect_err("kind rejected");
        match err {
            ImportError::InvalidRow { line, source } => {
                assert_eq!(line, 3);
                assert_eq!(
                    source,
                    DomainError::UnknownCriterionKind("costly".to_string())
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reads_products_and_derives_profit() {
        let data = "id,name,purchase_cost,price_sale,stock,sold,category\n7,Kopi,12000,15500,40,32,Drinks\n";
        let products = read_products(Cursor::new(data)).expect("products parse");
        assert_eq!(products[0].id, ProductId(7));
        assert_eq!(products[0].profit, 3_500);
    }

    #[test]
    fn malformed_numbers_surface_as_csv_errors() {
        let data = "id,name,purchase_cost,price_sale,stock,sold,category\n1,Kopi,cheap,15500,40,32,Drinks\n";
        assert!(matches!(
            read_products(Cursor::new(data)),
            Err(ImportError::Csv(_))
        ));
    }

    #[test]
    fn loads_files_into_the_store() {
        let dir = std::env::temp_dir().join(format!("profitrack-import-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let criteria_path = dir.join("criteria.csv");
        let products_path = dir.join("products.csv");
        std::fs::write(
            &criteria_path,
            "id,name,weight,type\n1,ROI,0.5,benefit\n2,roi,0.5,cost\n",
        )
        .expect("write criteria");
        std::fs::write(
            &products_path,
            "id,name,purchase_cost,price_sale,stock,sold,category\n1,Kopi,100,150,10,5,Drinks\n",
        )
        .expect("write products");

        let store = InMemoryStore::default();
        let err = load_criteria_csv(&criteria_path, &store).expect_err("duplicate name");
        assert!(matches!(
            err,
            ImportError::Store {
                line: 3,
                source: RepositoryError::Conflict
            }
        ));
        assert_eq!(store.list_criteria().expect("list").len(), 1);

        assert_eq!(load_products_csv(&products_path, &store).expect("load"), 1);
        assert!(store.product(ProductId(1)).expect("lookup").is_some());

        std::fs::remove_dir_all(&dir).ok();
    }
}
