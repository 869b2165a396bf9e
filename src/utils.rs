/// Formats a memory amount given in KB using the largest fitting unit.
///
/// ```text
/// 512.0     -> "512.0 KB"
/// 2048.0    -> "2.0 MB"
/// 3145728.0 -> "3.0 GB"
/// ```
pub fn format_memory(kb: f64) -> String {
    if kb > 1048576.0 {
        format!("{:.1} GB", kb / 1048576.0)
    } else if kb > 1024.0 {
        format!("{:.1} MB", kb / 1024.0)
    } else {
        format!("{:.1} KB", kb)
    }
}
