use std::io::Read;

use tally_core::{Cell, Grid};

use crate::error::ImportError;

/// Reads CSV text into a [`Grid`] without assuming where the header is.
///
/// Blank fields become [`Cell::Empty`], everything else [`Cell::Text`]; the
/// normalizer does the typing later. Rows may have differing lengths.
pub fn read_csv_grid<R: Read>(data: R) -> Result<Grid, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result?;
        grid.push(record.iter().map(Cell::from).collect());
    }
    Ok(grid)
}
