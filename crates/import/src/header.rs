use tally_core::Cell;

/// Field-label fragments seen in ledger and payment exports. A row that
/// contains several of them is almost certainly the header.
pub const ANCHOR_KEYWORDS: &[&str] = &[
    // ledger
    "支付日期",
    "实收额",
    "支付序号",
    "电话 1",
    // payment statements
    "交易时间",
    "收支类型",
    "交易类型",
    "金额",
    "明细名称",
    "资金流向",
    "业务描述",
    "押金",
    "收/支",
    "商品说明",
    "交易分类",
    "交易状态",
    "交易订单号",
];

/// Rows scanned from the top of a sheet.
pub const SCAN_LIMIT: usize = 100;

/// Fewer anchors than this and we refuse to guess.
pub const MIN_ANCHOR_SCORE: usize = 2;

/// Number of distinct anchors contained in the row's joined text.
pub fn score_row(row: &[Cell]) -> usize {
    let joined = row.iter().map(Cell::text).collect::<Vec<_>>().join(" ");
    ANCHOR_KEYWORDS
        .iter()
        .filter(|anchor| joined.contains(*anchor))
        .count()
}

/// Index of the best-scoring row among the first [`SCAN_LIMIT`] rows.
/// Ties go to the earliest row.
pub fn detect_header_row(grid: &[Vec<Cell>]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;

    for (idx, row) in grid.iter().take(SCAN_LIMIT).enumerate() {
        if row.is_empty() {
            continue;
        }
        let score = score_row(row);
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((idx, score));
        }
    }

    best.filter(|&(_, score)| score >= MIN_ANCHOR_SCORE)
        .map(|(idx, _)| idx)
}
