//! Writers for `<prefix>.res`, `<prefix>_clustered.res` and `<prefix>.log`
//! (spec.md §6), and the `[SUPPLEMENT]` deterministic ordering and
//! per-band progress detail from SPEC_FULL.md.

use combifold::folder::SearchStats;
use combifold::superbb::SuperBB;
use std::io::{self, Write};

/// Formats one survivor as `[<slot>(rx ry rz tx ty tz), …]
/// weightedTransScore <v> numTrans <n>` (spec.md §6), members in
/// ascending chain-slot order so the line is stable across runs
/// regardless of the order composition happened to build them in
/// (SPEC_FULL.md "deterministic tie-break in output formatting").
pub fn format_assembly_line(assembly: &SuperBB) -> String {
    let mut members: Vec<usize> = assembly.members.clone();
    members.sort_unstable();

    let mut rendered = Vec::with_capacity(members.len());
    for global_id in members {
        let pos = assembly.members.iter().position(|&m| m == global_id).expect("member in identity");
        let (rx, ry, rz, t) = assembly.placements[pos].to_euler_translation();
        rendered.push(format!("{}({} {} {} {} {} {})", global_id, rx, ry, rz, t.x, t.y, t.z));
    }
    format!(
        "[{}] weightedTransScore {} numTrans {}",
        rendered.join(", "),
        assembly.weighted_trans_score(),
        assembly.trans_used_count
    )
}

/// Writes survivors best-first, one per line, to `writer` (spec.md §6
/// `.res` / `_clustered.res`). Callers pass already-ranked assemblies
/// (the best-K heap and the clusterer both guarantee this).
pub fn write_assemblies(writer: &mut impl Write, assemblies: &[SuperBB]) -> io::Result<()> {
    for assembly in assemblies {
        writeln!(writer, "{}", format_assembly_line(assembly))?;
    }
    Ok(())
}

/// Writes the `.log` progress file: per-band wall time, candidate
/// counts broken down by rejection reason, and the best score seen
/// (SPEC_FULL.md "progress log detail").
pub fn write_log(
    writer: &mut impl Write,
    stats: &SearchStats,
    unreachable: &[String],
    timed_out: bool,
) -> io::Result<()> {
    if !unreachable.is_empty() {
        writeln!(writer, "warning: unreachable subunit types: {}", unreachable.join(", "))?;
    }
    for band in &stats.bands {
        writeln!(
            writer,
            "band size={} attempted={} incompatible_overlap={} duplicate_placement={} \
             collision_rejected={} constraint_rejected={} survivors={} best_score={} elapsed={:.3}s",
            band.size,
            band.candidates_attempted,
            band.incompatible_overlap,
            band.duplicate_placement,
            band.collision_rejected,
            band.constraint_rejected,
            band.survivors,
            band.best_score.map(|s| s.to_string()).unwrap_or_else(|| "n/a".to_string()),
            band.elapsed.as_secs_f64()
        )?;
    }
    if timed_out {
        writeln!(writer, "warning: search timed out; partial results were flushed")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use combifold::geometry::Transform;

    #[test]
    fn formats_members_in_ascending_slot_order() {
        let mut assembly = SuperBB::singleton(1);
        assembly.members = vec![1, 0];
        assembly.placements = vec![Transform::identity(), Transform::identity()];

        let line = format_assembly_line(&assembly);
        assert!(line.starts_with("[0("));
        assert!(line.contains("weightedTransScore"));
        assert!(line.contains("numTrans"));
    }
}
