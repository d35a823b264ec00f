fn main() {{
    if let Err(e) = {crate_name}::__run::run() {{
        eprintln!("ERROR: {{}}", e);
        std::process::exit(1);
    }}
}}
