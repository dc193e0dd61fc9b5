use statement_import_rs::CsvImportBuilder;
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let file_path = if args.len() > 1 {
        &args[1]
    } else {
        println!("Using example CSV data from demos/sample_revolut.csv\n");
        "demos/sample_revolut.csv"
    };

    let mut builder = CsvImportBuilder::new().filename(file_path);
    if let Some(template) = args.get(2) {
        builder = builder.template(template);
    }
    let preview = builder.preview()?;

    if let Some(template) = &preview.detected_template {
        println!("Detected template: {}", template);
    }
    println!(
        "Rows: {} total, {} valid, {} skipped, {} errors\n",
        preview.total_rows,
        preview.valid_rows,
        preview.skipped_rows,
        preview.errors.len()
    );

    for (i, tx) in preview.transactions.iter().take(10).enumerate() {
        println!("Transaction {}:", i + 1);
        println!("  Date: {}", tx.date);
        println!(
            "  Amount: {}{} {}",
            if tx.is_expense { "-" } else { "" },
            tx.amount,
            tx.currency
        );
        println!("  Description: {}", tx.description);
        if let Some(category) = &tx.mapped_category {
            println!("  Category: {}", category);
        }
        println!("  External ID: {}", tx.external_id);
        println!();
    }

    for error in &preview.errors {
        println!("Row {}: {}", error.row, error.message);
    }

    Ok(())
}
