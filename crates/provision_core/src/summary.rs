/// Resource change counts from the tool's apply trailer line:
/// `Apply complete! Resources: 1 added, 0 changed, 0 destroyed.`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSummary {
    pub added: usize,
    pub changed: usize,
    pub destroyed: usize,
}

impl ChangeSummary {
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.changed == 0 && self.destroyed == 0
    }
}

/// Scan apply output for the change trailer. The trailer is advisory (used
/// for logging and as a secondary idempotence signal); its absence is `None`,
/// not an error.
pub fn parse_change_summary(apply_output: &str) -> Option<ChangeSummary> {
    apply_output
        .lines()
        .rev()
        .find_map(|line| parse_trailer_line(line.trim()))
}

fn parse_trailer_line(line: &str) -> Option<ChangeSummary> {
    let counts = line
        .strip_prefix("Apply complete! Resources: ")
        .or_else(|| line.strip_prefix("Destroy complete! Resources: "))?;

    let mut added = None;
    let mut changed = None;
    let mut destroyed = None;

    for part in counts.trim_end_matches('.').split(", ") {
        let mut words = part.split_whitespace();
        let count: usize = words.next()?.parse().ok()?;
        match words.next()? {
            "added" => added = Some(count),
            "changed" => changed = Some(count),
            "destroyed" => destroyed = Some(count),
            _ => return None,
        }
    }

    // Destroy trailers only report a destroyed count.
    Some(ChangeSummary {
        added: added.unwrap_or(0),
        changed: changed.unwrap_or(0),
        destroyed: destroyed.unwrap_or(0),
    })
}
