//! The `mastercheck init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("mastercheck.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("questions")?;
    write_if_missing(Path::new("questions/module-1.toml"), EXAMPLE_QUESTION_SET)?;
    write_if_missing(Path::new("resources.toml"), EXAMPLE_RESOURCES)?;

    println!("\nNext steps:");
    println!("  1. Add question sets under questions/");
    println!("  2. Run: mastercheck validate --question-set questions");
    println!("  3. Run: mastercheck take --module 1");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mastercheck configuration

default_source = "local"
learner = "learner"
store_path = ".mastercheck/attempts.json"
resources_path = "resources.toml"
max_retries = 3
retry_delay_ms = 1000

[sources.local]
type = "directory"
path = "questions"

# A quiz generation service:
# [sources.remote]
# type = "http"
# base_url = "http://localhost:8000"
# token = "${MASTERCHECK_SOURCE_TOKEN}"
"#;

const EXAMPLE_QUESTION_SET: &str = r#"[quiz]
module_id = "1"
title = "Computer Abstractions and Technology"
description = "Performance, abstraction and the great ideas of computer architecture"

[[questions]]
id = "1"
prompt = "Which observation predicts that transistor counts double roughly every two years?"
topic = "Technology Trends"
sub_topic = "Moore's law"
correct = "b"
hint = "It is named after a co-founder of Intel."
choices = [
    { id = "a", text = "Amdahl's law" },
    { id = "b", text = "Moore's law" },
    { id = "c", text = "Dennard scaling" },
    { id = "d", text = "Little's law" },
]

[[questions]]
id = "2"
prompt = "CPU time equals instruction count times CPI times what?"
topic = "Performance"
sub_topic = "CPU time"
correct = "c"
choices = [
    { id = "a", text = "Clock rate" },
    { id = "b", text = "Number of cores" },
    { id = "c", text = "Clock cycle time" },
    { id = "d", text = "Cache hit rate" },
]

[[questions]]
id = "3"
prompt = "Speeding up 40% of a program by 2x gives an overall speedup of about:"
topic = "Performance"
sub_topic = "Amdahl's law"
correct = "a"
hint = "Only the improved fraction gets faster."
choices = [
    { id = "a", text = "1.25x" },
    { id = "b", text = "1.4x" },
    { id = "c", text = "2x" },
    { id = "d", text = "0.8x" },
]

[[questions]]
id = "4"
prompt = "Which layer sits between application software and the hardware?"
topic = "Abstraction"
sub_topic = "System software"
correct = "d"
choices = [
    { id = "a", text = "The compiler's front end" },
    { id = "b", text = "The instruction cache" },
    { id = "c", text = "The datapath" },
    { id = "d", text = "The operating system" },
]

[[questions]]
id = "5"
prompt = "Why did uniprocessor clock rates stop climbing after 2004?"
topic = "Technology Trends"
sub_topic = "Power wall"
correct = "b"
choices = [
    { id = "a", text = "Transistors stopped shrinking" },
    { id = "b", text = "Power and cooling limits" },
    { id = "c", text = "Memory became too cheap" },
    { id = "d", text = "Compilers could not keep up" },
]
"#;

const EXAMPLE_RESOURCES: &str = r#"# Links recommended after a wrong answer, per module and question id.

[resources."1"]
"1" = ["https://en.wikipedia.org/wiki/Moore%27s_law"]
"3" = ["https://en.wikipedia.org/wiki/Amdahl%27s_law"]
"5" = ["https://en.wikipedia.org/wiki/Dennard_scaling"]
"#;
