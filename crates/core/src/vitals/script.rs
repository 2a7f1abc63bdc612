//! In-page observer script and the matching read expression

/// Global the init script stores its state under. It lives in the page's
/// own context, so every navigation starts again from a fresh object.
pub const VITALS_GLOBAL: &str = "__shopwatchVitals";

/// Event-timing entries shorter than this are not interactions worth keeping
pub const MIN_EVENT_DURATION_MS: f64 = 16.0;

/// Installed with `install_before_any_page_script`. Each observer is
/// wrapped so an unsupported entry type only disables that one metric.
pub const INSTALL_SCRIPT: &str = r#"(() => {
  if (window.__shopwatchVitals) return;
  const vitals = { lcp: undefined, cls: 0, inp: undefined };
  Object.defineProperty(window, '__shopwatchVitals', { value: vitals, enumerable: false });

  try {
    new PerformanceObserver((list) => {
      const entries = list.getEntries();
      const last = entries[entries.length - 1];
      if (last) vitals.lcp = last.startTime;
    }).observe({ type: 'largest-contentful-paint', buffered: true });
  } catch (e) {}

  try {
    new PerformanceObserver((list) => {
      for (const entry of list.getEntries()) {
        if (!entry.hadRecentInput && entry.value > 0) vitals.cls += entry.value;
      }
    }).observe({ type: 'layout-shift', buffered: true });
  } catch (e) {}

  try {
    new PerformanceObserver((list) => {
      for (const entry of list.getEntries()) {
        const duration = entry.duration || 0;
        if (duration < 16) continue;
        if (vitals.inp === undefined || duration > vitals.inp) vitals.inp = duration;
      }
    }).observe({ type: 'event', buffered: true, durationThreshold: 16 });
  } catch (e) {}
})();"#;

/// Evaluates to `{lcp, cls, inp}` or `null` when the script never ran
pub const READ_EXPRESSION: &str = r#"(() => {
  const v = window.__shopwatchVitals;
  if (!v) return null;
  return { lcp: v.lcp ?? null, cls: v.cls ?? null, inp: v.inp ?? null };
})()"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_and_reader_agree_on_global() {
        assert!(INSTALL_SCRIPT.contains(VITALS_GLOBAL));
        assert!(READ_EXPRESSION.contains(VITALS_GLOBAL));
        assert!(INSTALL_SCRIPT.contains(&format!("durationThreshold: {}", MIN_EVENT_DURATION_MS as u32)));
    }
}
