//! User-facing renderings of an [`AnalysisResult`].

use anyhow::{anyhow, Result};
use similar::TextDiff;
use std::collections::HashMap;
use std::fmt::Write;
use std::fs;
use std::path::PathBuf;

use crate::report::{AnalysisResult, ClassifiedPair};
use crate::record::QuestionRecord;

const RULE_WIDTH: usize = 80;

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Looks up the record behind a document; `records` must be the slice the
/// result was computed from.
fn record_for<'a>(
    result: &AnalysisResult,
    records: &'a [QuestionRecord],
    doc: usize,
) -> Result<&'a QuestionRecord> {
    let index = result.document(doc).record_index;
    records.get(index).ok_or_else(|| {
        anyhow!(
            "Record {} is missing: {} records given, result was built from a different input",
            index,
            records.len()
        )
    })
}

/// Gives renderers the contents of a source group, when there is one to read.
pub trait SourceText {
    fn read_source(&self, source: &str) -> Option<String>;
}

/// Reads source groups as files, relative to `base_dir` when given.
pub struct SourceFiles {
    base_dir: Option<PathBuf>,
}

impl SourceFiles {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }
}

impl SourceText for SourceFiles {
    fn read_source(&self, source: &str) -> Option<String> {
        let path = match &self.base_dir {
            Some(dir) => dir.join(source),
            None => PathBuf::from(source),
        };
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Source not readable, skipping diff");
                None
            }
        }
    }
}

impl SourceText for HashMap<String, String> {
    fn read_source(&self, source: &str) -> Option<String> {
        self.get(source).cloned()
    }
}

/// Unified diff between two sources, `None` if either cannot be read.
pub fn source_diff(sources: &dyn SourceText, old: &str, new: &str) -> Option<String> {
    let old_text = sources.read_source(old)?;
    let new_text = sources.read_source(new)?;
    let diff = TextDiff::from_lines(old_text.as_str(), new_text.as_str());
    let rendered = diff.unified_diff().context_radius(3).header(old, new).to_string();
    Some(rendered)
}

fn relation_label(pair: &ClassifiedPair) -> &'static str {
    if pair.is_cross_group() {
        "DIFFERENT SOURCES"
    } else {
        "SAME SOURCE"
    }
}

pub fn render_text(result: &AnalysisResult, records: &[QuestionRecord], verbose: bool) -> Result<String> {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    writeln!(out, "Similarity threshold: {}", result.threshold)?;
    writeln!(out, "Questions analyzed: {}", result.documents.len())?;

    if result.pairs.is_empty() {
        writeln!(out, "\nNo question pairs with similarity >= threshold")?;
        return Ok(out);
    }

    writeln!(out, "\n{}", rule)?;
    writeln!(out, "SIMILAR QUESTIONS FOUND: {} pairs", result.pairs.len())?;
    writeln!(out, "{}\n", rule)?;

    for (rank, pair) in result.pairs.iter().enumerate() {
        writeln!(out, "Pair {}: similarity = {:.3}", rank + 1, pair.pair.similarity)?;
        writeln!(out, "  [{}]", relation_label(pair))?;
        if pair.exact_duplicate {
            writeln!(out, "  [EXACT DUPLICATE]")?;
        }

        for idx in [pair.pair.i, pair.pair.j] {
            let doc = result.document(idx);
            writeln!(out, "\nQuestion {} ({}):", idx + 1, doc.kind)?;
            writeln!(out, "  Name: {}", truncate(&doc.name, 100))?;
            writeln!(out, "  Source: {}", doc.source)?;
            if verbose {
                let record = record_for(result, records, idx)?;
                writeln!(out, "  Text: {}", truncate(&record.text, 200))?;
                writeln!(out, "  Answers: {}", record.answers.len())?;
            }
        }
        writeln!(out, "\n{}\n", "-".repeat(RULE_WIDTH))?;
    }

    let stats = &result.statistics;
    writeln!(out, "Summary: {} similar pairs", stats.pair_count)?;
    writeln!(out, "Mean similarity: {:.3}", stats.mean)?;
    writeln!(out, "Max similarity: {:.3}", stats.max)?;
    writeln!(out, "Min similarity: {:.3}", stats.min)?;
    writeln!(out, "Exact duplicates (>= {}): {}", result.exact_threshold, stats.exact_duplicates)?;
    writeln!(out, "  - Pairs across sources: {}", stats.cross_group)?;
    writeln!(out, "  - Pairs within a source: {}", stats.same_group)?;

    let groups = result.groups_with_cross_duplicates();
    if !groups.is_empty() {
        writeln!(out, "\nSources with duplicates in other sources:")?;
        for group in groups {
            writeln!(out, "  - {}", group)?;
        }
    }

    Ok(out)
}

pub fn render_json(result: &AnalysisResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

fn write_question(out: &mut String, heading: &str, result: &AnalysisResult, records: &[QuestionRecord], idx: usize) -> Result<()> {
    let doc = result.document(idx);
    let record = record_for(result, records, idx)?;

    writeln!(out, "#### {}\n", heading)?;
    writeln!(out, "- **Source:** `{}`", doc.source)?;
    writeln!(out, "- **Name:** {}", doc.name)?;
    writeln!(out, "- **Type:** {}\n", doc.kind)?;
    writeln!(out, "**Question text:**\n")?;
    writeln!(out, "> {}\n", record.text)?;

    if !record.answers.is_empty() {
        writeln!(out, "**Answers:**\n")?;
        for (n, answer) in record.answers.iter().enumerate() {
            writeln!(out, "{}. {}", n + 1, answer)?;
        }
        writeln!(out)?;
    }

    if !record.feedbacks.is_empty() {
        writeln!(out, "<details>\n<summary>Feedbacks</summary>\n")?;
        for (n, feedback) in record.feedbacks.iter().enumerate() {
            writeln!(out, "{}. {}", n + 1, feedback)?;
        }
        writeln!(out, "\n</details>\n")?;
    }
    Ok(())
}

/// Markdown report. Cross-source pairs get a unified diff of both sources
/// when `sources` can read them.
pub fn render_markdown(
    result: &AnalysisResult,
    records: &[QuestionRecord],
    sources: &dyn SourceText,
) -> Result<String> {
    let mut out = String::new();
    let stats = &result.statistics;

    writeln!(out, "# Similar Questions Report\n")?;
    writeln!(out, "**Similarity threshold:** {}\n", result.threshold)?;
    writeln!(out, "**Questions analyzed:** {}\n", result.documents.len())?;
    writeln!(out, "**Similar pairs found:** {}\n", stats.pair_count)?;

    if !result.pairs.is_empty() {
        writeln!(out, "## Statistics\n")?;
        writeln!(out, "- **Mean similarity:** {:.3}", stats.mean)?;
        writeln!(out, "- **Max similarity:** {:.3}", stats.max)?;
        writeln!(out, "- **Min similarity:** {:.3}", stats.min)?;
        writeln!(out, "- **Standard deviation:** {:.3}", stats.std_dev)?;
        writeln!(out, "- **Exact duplicates (>= {}):** {}", result.exact_threshold, stats.exact_duplicates)?;
        writeln!(out, "- **Pairs across sources:** {}", stats.cross_group)?;
        writeln!(out, "- **Pairs within a source:** {}\n", stats.same_group)?;
        writeln!(out, "---\n")?;
    }

    writeln!(out, "## Similar Question Details\n")?;
    for (rank, pair) in result.pairs.iter().enumerate() {
        writeln!(out, "### Pair {}: similarity {:.4}\n", rank + 1, pair.pair.similarity)?;
        let marker = if pair.is_cross_group() { "Different sources" } else { "Same source" };
        writeln!(out, "**{}**\n", marker)?;

        write_question(&mut out, "Question 1", result, records, pair.pair.i)?;
        write_question(&mut out, "Question 2", result, records, pair.pair.j)?;

        if pair.is_cross_group() {
            let old = &result.document(pair.pair.i).source;
            let new = &result.document(pair.pair.j).source;
            if let Some(diff) = source_diff(sources, old, new) {
                writeln!(out, "#### Source diff\n")?;
                writeln!(out, "<details>\n<summary>Full diff</summary>\n")?;
                writeln!(out, "```diff\n{}\n```\n", diff.trim_end())?;
                writeln!(out, "</details>\n")?;
            }
        }
        writeln!(out, "---\n")?;
    }

    let groups = result.groups_with_cross_duplicates();
    if !groups.is_empty() {
        writeln!(out, "## Sources With Duplicates\n")?;
        writeln!(out, "Sources holding questions duplicated in other sources:\n")?;
        for group in &groups {
            writeln!(out, "- `{}`", group)?;
        }
        writeln!(out)?;

        writeln!(out, "```bash")?;
        for group in &groups {
            writeln!(out, "# Review: {}", group)?;
            writeln!(out, "cat {}\n", shell_quote(group))?;
        }
        writeln!(out, "```\n")?;

        writeln!(out, "### Commands to remove duplicates\n")?;
        writeln!(out, "```bash")?;
        for group in &groups {
            writeln!(out, "rm {}", shell_quote(group))?;
        }
        writeln!(out, "```\n")?;
    }

    Ok(out)
}

fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Bash script removing the later source of every exact cross-source pair.
/// Returns `None` when there is nothing to remove.
pub fn render_removal_script(result: &AnalysisResult, base_dir: Option<&str>) -> Result<Option<String>> {
    let candidates = result.removal_candidates();
    if candidates.is_empty() {
        return Ok(None);
    }

    let mut out = String::new();
    writeln!(out, "#!/bin/bash")?;
    writeln!(out, "# Removes sources holding exact duplicates of questions found elsewhere")?;
    writeln!(out, "# Threshold used: {}", result.threshold)?;
    writeln!(out, "# Exact duplicates found: {}", result.exact_cross_group_pairs().count())?;
    writeln!(out, "\nset -e\n")?;
    writeln!(out, "echo 'Removing {} files'\n", candidates.len())?;

    writeln!(out, "# Exact duplicate pairs:")?;
    for (n, pair) in result.exact_cross_group_pairs().enumerate() {
        let kept = result.document(pair.pair.i);
        let removed = result.document(pair.pair.j);
        writeln!(out, "# Pair {} (similarity: {:.4}):", n + 1, pair.pair.similarity)?;
        writeln!(out, "#   Original: {} - {}", kept.source, truncate(&kept.name, 60))?;
        writeln!(out, "#   Duplicate: {} - {}", removed.source, truncate(&removed.name, 60))?;
        writeln!(out, "#")?;
    }
    writeln!(out)?;

    if let Some(dir) = base_dir {
        writeln!(out, "cd {}\n", shell_quote(dir))?;
    }

    for source in &candidates {
        let quoted = shell_quote(source);
        writeln!(out, "echo Removing: {}", quoted)?;
        writeln!(out, "rm -f {}", quoted)?;
    }
    writeln!(out, "\necho 'Done: {} files removed'", candidates.len())?;

    Ok(Some(out))
}
