use super::{json_pretty, load_manifest, EXIT_SUCCESS};
use brewkit_core::BrewfileLocation;
use brewkit_schema::{EntryKind, Manifest};

/// Which kinds `list` prints. Formulae when nothing is selected.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct KindFilter {
    /// List every entry.
    #[arg(long, default_value_t = false)]
    all: bool,
    #[arg(long, default_value_t = false)]
    brews: bool,
    #[arg(long, default_value_t = false)]
    casks: bool,
    #[arg(long, default_value_t = false)]
    mas: bool,
    #[arg(long, default_value_t = false)]
    whalebrew: bool,
    #[arg(long, default_value_t = false)]
    taps: bool,
}

impl KindFilter {
    fn includes(&self, kind: EntryKind) -> bool {
        if self.all {
            return true;
        }
        let any = self.brews || self.casks || self.mas || self.whalebrew || self.taps;
        match kind {
            EntryKind::Brew => self.brews || !any,
            EntryKind::Cask => self.casks,
            EntryKind::Mas => self.mas,
            EntryKind::Whalebrew => self.whalebrew,
            EntryKind::Tap => self.taps,
        }
    }
}

fn names<'a>(manifest: &'a Manifest, filter: &'a KindFilter) -> impl Iterator<Item = &'a str> {
    manifest
        .entries
        .iter()
        .filter(|e| filter.includes(e.kind()))
        .map(|e| e.name())
}

pub fn run(location: &BrewfileLocation, filter: &KindFilter, json: bool) -> Result<u8, String> {
    let (_, manifest) = load_manifest(location)?;
    if json {
        let names: Vec<&str> = names(&manifest, filter).collect();
        println!("{}", json_pretty(&names)?);
    } else {
        for name in names(&manifest, filter) {
            println!("{name}");
        }
    }
    Ok(EXIT_SUCCESS)
}
