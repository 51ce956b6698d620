use std::{
    collections::HashMap,
    error,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use revsynth::{
    config::{Config, IniValues},
    optimize::PostProcessor,
    scheme::{quantum_cost, Scheme},
    synthesis::{CompositeGenerator, GtGeneratorWithMemory},
    table::{self, extend, TruthTable, TruthTableParser},
    tfc::TfcFormatter,
};

type AnyError = Box<dyn error::Error>;

const SEPARATOR: &str = "\n===============================================================";

/// Synthesize every configured truth table and TFC circuit.
pub fn general_synthesis(values: &IniValues, config: &Config) -> Result<(), AnyError> {
    let mut results = open_results(values)?;
    let schemes_folder = schemes_folder(values)?;

    process_truth_tables(values, config, &mut results, &schemes_folder);
    process_tfc_files(values, config, &mut results, &schemes_folder);

    Ok(())
}

fn process_truth_tables(
    values: &IniValues,
    config: &Config,
    results: &mut dyn Write,
    schemes_folder: &Path,
) {
    for file_name in values.all("truth-table-input") {
        let outcome = (|| -> Result<(), AnyError> {
            let input = BufReader::new(File::open(file_name)?);
            let _ = writeln!(results, "Truth table: {}", file_name);

            let parsed = TruthTableParser::parse(input)?;

            let n = parsed.input_count;
            let m = parsed.output_count;

            let mut order: HashMap<usize, usize> = HashMap::new();
            if n == m {
                for index in 0..n {
                    order.insert(index, index);
                }
            }

            let table = if n != m || !config.keep_output_variables_order {
                let (extended, new_order) =
                    extend::optimize_hamming_distance(&parsed.table, n, m, config);
                order = new_order;
                extended
            } else {
                parsed.table
            };

            let output_path = output_file_path(schemes_folder, file_name, "-out.tfc");

            let mut formatter = TfcFormatter::with_counts(n, m, order);
            formatter.set_sort_output_variables(config.sort_output_variables_order);

            synthesize_scheme(&table, config, results, &output_path, &mut formatter)
        })();

        if let Err(error) = outcome {
            let _ = writeln!(results, "{}", error);
            let _ = writeln!(results, "{}", SEPARATOR);
        }
    }
}

fn process_tfc_files(
    values: &IniValues,
    config: &Config,
    results: &mut dyn Write,
    schemes_folder: &Path,
) {
    for file_name in values.all("tfc-input") {
        let outcome = (|| -> Result<(), AnyError> {
            let input = BufReader::new(File::open(file_name)?);
            let _ = writeln!(results, "TFC file: {}", file_name);

            let mut formatter = TfcFormatter::new();
            let scheme = formatter.parse(input)?;

            let _ = writeln!(results, "Original quantum cost: {}", quantum_cost(&scheme));

            let table = table::table_from_scheme(&scheme, formatter.variables_count());
            let output_path = output_file_path(schemes_folder, file_name, "-out.tfc");

            synthesize_scheme(&table, config, results, &output_path, &mut formatter)
        })();

        if let Err(error) = outcome {
            let _ = writeln!(results, "{}", error);
            let _ = writeln!(results, "{}", SEPARATOR);
        }
    }
}

fn synthesize_scheme(
    table: &TruthTable,
    config: &Config,
    results: &mut dyn Write,
    output_path: &Path,
    formatter: &mut TfcFormatter,
) -> Result<(), AnyError> {
    let generator = CompositeGenerator::new(config);
    let scheme = generator.generate(table, results)?;

    let mut output = BufWriter::new(File::create(output_path)?);
    let _ = writeln!(results, "Scheme file: {}", output_path.display());

    formatter.format(&mut output, &scheme)?;
    let _ = writeln!(results, "{}", SEPARATOR);

    Ok(())
}

/// Re-optimize existing TFC circuits.
pub fn post_processing(values: &IniValues, config: &Config) -> Result<(), AnyError> {
    let mut results = open_results(values)?;
    let schemes_folder = schemes_folder(values)?;

    for file_name in values.all("tfc-input") {
        let outcome = (|| -> Result<(), AnyError> {
            let input = BufReader::new(File::open(file_name)?);
            let _ = writeln!(results, "Original scheme file: {}", file_name);

            let mut formatter = TfcFormatter::new();
            let scheme = formatter.parse(input)?;

            let _ = writeln!(results, "Complexity before optimization: {}", scheme.len());

            let optimized = PostProcessor::new(config).optimize(&scheme)?;

            if !optimized.equivalent_to(&scheme, formatter.variables_count()) {
                return Err("Optimized scheme is not valid".into());
            }

            let _ = writeln!(
                results,
                "Complexity after optimization: {}",
                optimized.len()
            );

            let output_path = output_file_path(&schemes_folder, file_name, "-opt.tfc");
            let mut output = BufWriter::new(File::create(&output_path)?);

            formatter.format(&mut output, &optimized)?;
            let _ = writeln!(results, "Optimized scheme file: {}", output_path.display());
            let _ = writeln!(results, "{}", SEPARATOR);

            Ok(())
        })();

        if let Err(error) = outcome {
            let _ = writeln!(results, "{}", error);
            let _ = writeln!(results, "{}", SEPARATOR);
        }
    }

    Ok(())
}

/// Synthesize truth tables on ancillary lines.
pub fn memory_synthesis(values: &IniValues, config: &Config) -> Result<(), AnyError> {
    let mut results = open_results(values)?;
    let schemes_folder = schemes_folder(values)?;

    for file_name in values.all("truth-table-input") {
        let outcome = (|| -> Result<(), AnyError> {
            let input = BufReader::new(File::open(file_name)?);
            let _ = writeln!(results, "Truth table: {}", file_name);

            let parsed = TruthTableParser::parse(input)?;

            let n = parsed.input_count;
            let m = parsed.output_count;

            let generator = GtGeneratorWithMemory::new(config);
            let scheme = generator.generate(&parsed.table)?;

            let _ = writeln!(results, "Complexity after all optimizations: {}", scheme.len());
            let _ = writeln!(results, "Quantum cost: {}", quantum_cost(&scheme));

            if !GtGeneratorWithMemory::check_scheme_validity(&scheme, n, m, &parsed.table) {
                return Err("Generated scheme is not valid".into());
            }

            // outputs live on the ancillary lines
            let order: HashMap<usize, usize> = (0..m).map(|index| (index, n + index)).collect();

            let output_path = output_file_path(&schemes_folder, file_name, "-mem.tfc");
            let mut output = BufWriter::new(File::create(&output_path)?);

            let mut formatter = TfcFormatter::with_counts(n, m, order);
            formatter.format(&mut output, &scheme)?;

            let _ = writeln!(results, "Scheme file: {}", output_path.display());
            let _ = writeln!(results, "{}", SEPARATOR);

            Ok(())
        })();

        if let Err(error) = outcome {
            let _ = writeln!(results, "{}", error);
            let _ = writeln!(results, "{}", SEPARATOR);
        }
    }

    Ok(())
}

/// Out-of-core diagnostic: synthesize random permutations and verify.
pub fn random_check(values: &IniValues, config: &Config) -> Result<(), AnyError> {
    use rand::seq::SliceRandom;

    let mut results = open_results(values)?;

    let count = values.get_int("random-check-count", 10)?.max(1) as usize;
    let lines = values.get_int("random-check-lines", 4)?.max(1) as usize;

    let mut rng = rand::thread_rng();

    for round in 0..count {
        let mut table: TruthTable = (0..1 << lines).collect();
        table.shuffle(&mut rng);

        let _ = writeln!(results, "Round {}: {:?}", round, table);

        let scheme = CompositeGenerator::new(config).generate(&table, &mut results)?;

        // the generator verifies internally; double-check here anyway
        if !scheme.realizes(&table) {
            return Err("random check failed".into());
        }

        let _ = writeln!(results, "{}", SEPARATOR);
    }

    Ok(())
}

fn open_results(values: &IniValues) -> Result<BufWriter<File>, AnyError> {
    let file_name = values.get_string("results-file", "results.txt")?;
    Ok(BufWriter::new(File::create(file_name)?))
}

fn schemes_folder(values: &IniValues) -> Result<PathBuf, AnyError> {
    let folder = PathBuf::from(values.get_string("schemes-folder", "schemes")?);
    fs::create_dir_all(&folder)?;

    Ok(folder)
}

fn output_file_path(folder: &Path, input_file_name: &str, suffix: &str) -> PathBuf {
    let base = Path::new(input_file_name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input_file_name.to_string());

    folder.join(format!("{}{}", base, suffix))
}
