use std::env;

use proteos::workspace::Workspace;
use tabled::builder::Builder;
use tabled::settings::Alignment;
use tabled::settings::Style;
use tabled::settings::object::Rows;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let work = env::args().nth(1).expect("missing work directory");

    let tolerance = env::args()
        .nth(2)
        .map(|s| {
            s.parse::<usize>()
                .unwrap_or_else(|_| panic!("could not parse tolerance: {s}"))
        })
        .unwrap_or_default();

    let mut session = Workspace::existing(work).open()?;

    let mut builder = Builder::default();
    builder.push_record([
        "Peptide",
        "-->",
        "Match",
        "--",
        "--",
        "-->",
        "Genome",
        "-->",
        "Variant",
        "-->",
    ]);
    builder.push_record([
        "Index",
        "Sequence",
        "Entry",
        "Start",
        "End",
        "Cigar",
        "Chromosome",
        "Location",
        "Owners",
        "Nearby",
    ]);

    for result in session.matches() {
        let peptide = result?;

        if peptide.is_empty() {
            builder.push_record([
                peptide.index().to_string().as_str(),
                peptide.sequence(),
                "<None>",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
            ]);
            continue;
        }

        for hit in peptide.hits() {
            let location = hit.location();
            let nearby = hit
                .near_variants(tolerance)
                .iter()
                .map(|difference| difference.as_str())
                .collect::<Vec<_>>()
                .join(";");

            builder.push_record([
                peptide.index().to_string().as_str(),
                peptide.sequence(),
                hit.name(),
                &hit.record().start().to_string(),
                &hit.record().end().to_string(),
                hit.cigar().unwrap_or("<None>"),
                location.chromosome().unwrap_or("<None>"),
                location.peptide(),
                &hit.variant()
                    .map(|variant| variant.individuals().len().to_string())
                    .unwrap_or(String::from("<None>")),
                &nearby,
            ]);
        }
    }

    let table = builder
        .build()
        .with(Style::rounded())
        .modify(Rows::new(1..), Alignment::left())
        .to_string();

    println!("{}", table);

    Ok(())
}
