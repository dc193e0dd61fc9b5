use statement_import_rs::{Provider, StatementBuilder};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let file_path = if args.len() > 1 {
        &args[1]
    } else {
        println!("Using example statement from testdata/amundi_q2.txt\n");
        "testdata/amundi_q2.txt"
    };

    let mut builder = StatementBuilder::new().filename(file_path);
    if let Some(code) = args.get(2) {
        builder = builder.provider(code.parse::<Provider>()?);
    }
    let preview = builder.preview()?;

    println!("{}", serde_json::to_string_pretty(&preview.snapshot)?);

    for error in &preview.errors {
        println!("Row {}: {}", error.row, error.message);
    }
    for problem in &preview.validation_errors {
        println!("Validation: {}", problem);
    }

    Ok(())
}
