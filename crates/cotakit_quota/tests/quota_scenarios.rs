use std::collections::BTreeSet;

use cotakit_quota::{
    EnumCellValue, QuotaError, SpecColumnSchema, SpecQuotaPolicy, SpecTable, allocate, normalize,
    process_budget,
};

fn num(n: f64) -> EnumCellValue {
    EnumCellValue::Number(n)
}

fn text(s: &str) -> EnumCellValue {
    EnumCellValue::from(s)
}

fn build(columns: &[&str], rows: Vec<Vec<EnumCellValue>>) -> SpecTable {
    SpecTable::new(columns.iter().map(ToString::to_string).collect(), rows).expect("table")
}

fn simple_budget(items: &[(&str, f64, f64)]) -> SpecTable {
    build(
        &["Item", "Especificação", "Quantidade Total", "Valor Unitário", "Valor Total"],
        items
            .iter()
            .enumerate()
            .map(|(n_idx, (spec, qty, price))| {
                vec![num((n_idx + 1) as f64), text(spec), num(*qty), num(*price), num(qty * price)]
            })
            .collect(),
    )
}

fn flags(ids: &[usize]) -> BTreeSet<usize> {
    ids.iter().copied().collect()
}

fn treatment(table: &SpecTable, n_row: usize) -> String {
    table
        .cell(n_row, "TRATAMENTO FAVORECIDO DECRETO 8538/2015")
        .map(EnumCellValue::to_text)
        .unwrap_or_default()
}

fn number(table: &SpecTable, n_row: usize, col: &str) -> f64 {
    table
        .cell(n_row, col)
        .and_then(EnumCellValue::to_f64)
        .unwrap_or(f64::NAN)
}

fn assert_dense_item_numbers(table: &SpecTable) {
    for n_row in 0..table.height() {
        assert_eq!(number(table, n_row, "ITEM"), (n_row + 1) as f64);
    }
}

fn assert_value_invariants(table: &SpecTable) {
    let schema = SpecColumnSchema::derive(table.columns());
    for n_row in 0..table.height() {
        let n_price = number(table, n_row, "VALOR UNITÁRIO");
        let mut n_qty_sum = 0.0;
        for pair in &schema.pairs {
            let n_qty = number(table, n_row, &pair.qty);
            n_qty_sum += n_qty;
            let n_expected = ((n_qty * n_price) * 1e4).round_ties_even() / 1e4;
            assert_eq!(number(table, n_row, &pair.value), n_expected, "row {n_row}");
        }
        let n_qty_total = if schema.pairs.is_empty() {
            number(table, n_row, "QUANTIDADE TOTAL")
        } else {
            n_qty_sum
        };
        let n_expected = ((n_qty_total * n_price) * 1e4).round_ties_even() / 1e4;
        assert_eq!(number(table, n_row, "VALOR TOTAL"), n_expected, "row {n_row}");
    }
}

#[test]
fn scenario_a_small_item_is_exclusive() {
    let table = simple_budget(&[("Caneta", 500.0, 100.0)]);
    let outcome = process_budget(&table, &flags(&[0]), &SpecQuotaPolicy::default()).expect("run");

    assert_eq!(outcome.table.height(), 1);
    assert_eq!(treatment(&outcome.table, 0), "Exclusivo para ME/EPP");
    assert_eq!(number(&outcome.table, 0, "VALOR TOTAL"), 50_000.0);
}

#[test]
fn scenario_b_unit_price_above_ceiling_is_open() {
    let table = simple_budget(&[("Servidor", 1.0, 90_000.0)]);
    let outcome = process_budget(&table, &flags(&[0]), &SpecQuotaPolicy::default()).expect("run");

    assert_eq!(outcome.table.height(), 1);
    assert_eq!(treatment(&outcome.table, 0), "Ampla Disputa");
}

#[test]
fn scenario_c_large_item_splits_into_remainder_and_quota() {
    let table = simple_budget(&[("Papel A4", 10.0, 20.0), ("Notebook", 200.0, 1000.0)]);
    let outcome =
        process_budget(&table, &flags(&[1]), &SpecQuotaPolicy::default()).expect("run");
    let out = &outcome.table;

    assert_eq!(out.height(), 3);
    assert_eq!(number(out, 1, "QUANTIDADE TOTAL"), 150.0);
    assert_eq!(treatment(out, 1), "Ampla Disputa");
    assert_eq!(out.cell(1, "ESPECIFICAÇÃO"), Some(&text("Notebook")));

    assert_eq!(number(out, 2, "QUANTIDADE TOTAL"), 50.0);
    assert_eq!(treatment(out, 2), "Cota reservada para ME/EPP");
    assert_eq!(
        out.cell(2, "ESPECIFICAÇÃO"),
        Some(&text("Idem ao item 2, cota reservada para me/epp de até 25%"))
    );
    assert_eq!(number(out, 2, "VALOR TOTAL"), 50_000.0);

    assert_eq!(outcome.summary.cnt_split, 1);
    assert_dense_item_numbers(out);
    assert_value_invariants(out);
}

#[test]
fn scenario_d_unflagged_rows_stay_open_and_unchanged() {
    let table = simple_budget(&[("Notebook", 200.0, 1000.0), ("Caneta", 5.0, 1.0)]);
    let outcome = process_budget(&table, &flags(&[]), &SpecQuotaPolicy::default()).expect("run");
    let out = &outcome.table;

    assert_eq!(out.height(), 2);
    for n_row in 0..2 {
        assert_eq!(treatment(out, n_row), "Ampla Disputa");
    }
    assert_eq!(number(out, 0, "QUANTIDADE TOTAL"), 200.0);
    assert_eq!(number(out, 1, "QUANTIDADE TOTAL"), 5.0);
}

#[test]
fn missing_total_quantity_errors_only_without_family_columns() {
    let table = build(
        &["ITEM", "VALOR UNITÁRIO", "VALOR TOTAL"],
        vec![vec![num(1.0), num(10.0), num(10.0)]],
    );
    let err = process_budget(&table, &flags(&[0]), &SpecQuotaPolicy::default())
        .expect_err("must fail");
    assert_eq!(err, QuotaError::MissingQuantitySource);

    let table = build(
        &["ITEM", "QUANTIDADE SEDE", "VALOR UNITÁRIO", "VALOR TOTAL SEDE"],
        vec![vec![num(1.0), num(4.0), num(10.0), num(40.0)]],
    );
    let outcome = process_budget(&table, &flags(&[0]), &SpecQuotaPolicy::default()).expect("run");
    assert!(!outcome.table.has_column("QUANTIDADE TOTAL"));
    assert_eq!(number(&outcome.table, 0, "VALOR TOTAL"), 40.0);
}

#[test]
fn family_columns_split_proportionally_and_rebuild_the_whole() {
    let table = build(
        &[
            "ITEM",
            "ESPECIFICAÇÃO",
            "QUANTIDADE CAMPUS A",
            "QUANTIDADE CAMPUS B",
            "VALOR UNITÁRIO",
            "VALOR TOTAL CAMPUS A",
            "VALOR TOTAL CAMPUS B",
            "VALOR TOTAL",
        ],
        vec![
            vec![
                num(1.0),
                text("Monitor"),
                num(10.0),
                num(6.0),
                num(20_000.0),
                EnumCellValue::None,
                EnumCellValue::None,
                EnumCellValue::None,
            ],
            vec![
                num(2.0),
                text("Cabo"),
                num(120.0),
                num(80.0),
                num(1000.0),
                EnumCellValue::None,
                EnumCellValue::None,
                EnumCellValue::None,
            ],
        ],
    );

    let outcome =
        process_budget(&table, &flags(&[0, 1]), &SpecQuotaPolicy::default()).expect("run");
    let out = &outcome.table;

    assert_eq!(out.height(), 4);
    assert!(!out.has_column("QUANTIDADE TOTAL"));

    // monitor: 16 units × 20000, 25% band, per-campus quotas round(2.5)=2 and round(1.5)=2
    for (n_row_remainder, n_row_quota, l_original) in
        [(0usize, 1usize, [10.0, 6.0]), (2, 3, [120.0, 80.0])]
    {
        for (col, n_original) in ["QUANTIDADE CAMPUS A", "QUANTIDADE CAMPUS B"]
            .iter()
            .zip(l_original)
        {
            let n_rebuilt = number(out, n_row_remainder, col) + number(out, n_row_quota, col);
            assert_eq!(n_rebuilt, n_original, "{col}");
        }
    }
    assert_eq!(number(out, 1, "QUANTIDADE CAMPUS A"), 2.0);
    assert_eq!(number(out, 1, "QUANTIDADE CAMPUS B"), 2.0);
    assert_eq!(number(out, 3, "QUANTIDADE CAMPUS A"), 30.0);
    assert_eq!(number(out, 3, "QUANTIDADE CAMPUS B"), 20.0);
    assert_eq!(
        out.cell(3, "ESPECIFICAÇÃO"),
        Some(&text("Idem ao item 3, cota reservada para me/epp de até 25%"))
    );

    assert_dense_item_numbers(out);
    assert_value_invariants(out);
}

#[test]
fn allocation_preserves_value_invariants_for_mixed_selection() {
    let table = simple_budget(&[
        ("Caneta", 500.0, 100.0),
        ("Servidor", 1.0, 90_000.0),
        ("Notebook", 200.0, 1000.0),
        ("Cadeira", 2.0, 50_000.0),
        ("Papel", 3.0, 0.3333),
    ]);
    let policy = SpecQuotaPolicy::default();
    let (normalized, _) = normalize(&table, &policy).expect("normalize");
    let out = allocate(&normalized, true, &flags(&[0, 1, 2, 3, 42]), &policy).expect("allocate");

    assert_eq!(out.height(), 6);
    let l_treatments: Vec<String> = (0..out.height()).map(|n_row| treatment(&out, n_row)).collect();
    assert_eq!(
        l_treatments,
        vec![
            "Exclusivo para ME/EPP",
            "Ampla Disputa",
            "Ampla Disputa",
            "Cota reservada para ME/EPP",
            "Ampla Disputa",
            "Ampla Disputa",
        ]
    );
    assert_dense_item_numbers(&out);
    assert_value_invariants(&out);
}

#[test]
fn reprocessing_a_result_table_is_stable() {
    let table = simple_budget(&[("Notebook", 200.0, 1000.0)]);
    let policy = SpecQuotaPolicy::default();
    let first = process_budget(&table, &flags(&[0]), &policy).expect("first");

    let (normalized, report) = normalize(&first.table, &policy).expect("normalize");
    assert!(report.is_clean());
    assert_eq!(normalized, first.table);
}
