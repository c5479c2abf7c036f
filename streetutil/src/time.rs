use std::time::Instant;

const PROGRESS_FREQUENCY_SECONDS: f64 = 1.0;

fn elapsed_seconds(since: Instant) -> f64 {
    since.elapsed().as_secs_f64()
}

fn prettyprint_time(seconds: f64) -> String {
    format!("{:.4}s", seconds)
}

/// Adds commas every 3 digits.
pub fn prettyprint_usize(x: usize) -> String {
    let num = format!("{}", x);
    let mut result = String::new();
    let mut i = num.len();
    for c in num.chars() {
        result.push(c);
        i -= 1;
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
    }
    result
}

struct Progress {
    label: String,
    processed_items: usize,
    total_items: usize,
    started_at: Instant,
    last_printed_at: Instant,
}

impl Progress {
    fn new(label: &str, total_items: usize) -> Progress {
        Progress {
            label: label.to_string(),
            processed_items: 0,
            total_items,
            started_at: Instant::now(),
            last_printed_at: Instant::now(),
        }
    }

    // Returns the elapsed time and a summary line when done
    fn next(&mut self) -> Option<(f64, String)> {
        self.processed_items += 1;
        if self.processed_items > self.total_items {
            log::warn!(
                "{} is too few items for {} progress",
                prettyprint_usize(self.total_items),
                self.label
            );
        }

        if self.processed_items >= self.total_items {
            let elapsed = elapsed_seconds(self.started_at);
            let line = format!(
                "{} ({})... {}",
                self.label,
                prettyprint_usize(self.total_items),
                prettyprint_time(elapsed)
            );
            log::info!("{}", line);
            return Some((elapsed, line));
        }
        if elapsed_seconds(self.last_printed_at) >= PROGRESS_FREQUENCY_SECONDS {
            self.last_printed_at = Instant::now();
            log::info!(
                "{}: {}/{}... {}",
                self.label,
                prettyprint_usize(self.processed_items),
                prettyprint_usize(self.total_items),
                prettyprint_time(elapsed_seconds(self.started_at))
            );
        }
        None
    }
}

struct TimerSpan {
    name: String,
    started_at: Instant,
    nested_results: Vec<String>,
}

enum StackEntry {
    Span(TimerSpan),
    Progress(Progress),
}

/// Hierarchical timing of the phases of a long-running pass. Spans nest; when the Timer is
/// dropped, the tree of durations is logged, followed by every note and warning collected along
/// the way.
///
/// Warnings are for soft failures that shouldn't abort anything, but that someone should look at
/// after the run.
pub struct Timer {
    results: Vec<String>,
    stack: Vec<StackEntry>,
    outermost_name: String,

    notes: Vec<String>,
    warnings: Vec<String>,
}

impl Timer {
    pub fn new(name: &str) -> Timer {
        let mut t = Timer {
            results: Vec::new(),
            stack: Vec::new(),
            outermost_name: name.to_string(),
            notes: Vec::new(),
            warnings: Vec::new(),
        };
        t.start(name);
        t
    }

    // TODO Shouldn't use this much.
    pub fn throwaway() -> Timer {
        Timer::new("throwaway")
    }

    /// Log immediately, but also repeat at the end, to avoid having to scroll up and find
    /// interesting debug stuff.
    pub fn note(&mut self, line: String) {
        log::info!("{}", line);
        self.notes.push(line);
    }

    pub fn warn(&mut self, line: String) {
        log::warn!("{}", line);
        self.warnings.push(line);
    }

    pub fn warnings(&self) -> &Vec<String> {
        &self.warnings
    }

    pub fn notes(&self) -> &Vec<String> {
        &self.notes
    }

    /// Used to end the scope of a timer early.
    pub fn done(self) {}

    pub fn start(&mut self, name: &str) {
        log::debug!("{}...", name);
        self.stack.push(StackEntry::Span(TimerSpan {
            name: name.to_string(),
            started_at: Instant::now(),
            nested_results: Vec::new(),
        }));
    }

    pub fn stop(&mut self, name: &str) {
        let span = match self.stack.pop() {
            Some(StackEntry::Span(s)) => s,
            Some(StackEntry::Progress(p)) => {
                log::warn!("stop({}) called while {} still in progress", name, p.label);
                return;
            }
            None => {
                log::warn!("stop({}) called on an empty Timer", name);
                return;
            }
        };
        if span.name != name {
            log::warn!("stop({}) doesn't match the current span {}", name, span.name);
        }
        let elapsed = elapsed_seconds(span.started_at);
        let line = format!("{} took {}", span.name, prettyprint_time(elapsed));
        log::debug!("{}", line);

        let padding = "  ".repeat(self.stack.len());
        let mut lines = vec![format!("{}- {}", padding, line)];
        lines.extend(span.nested_results);
        self.add_results(lines);
    }

    pub fn start_iter(&mut self, name: &str, total_items: usize) {
        if total_items == 0 {
            return;
        }
        self.stack
            .push(StackEntry::Progress(Progress::new(name, total_items)));
    }

    pub fn next(&mut self) {
        let maybe_result = match self.stack.last_mut() {
            Some(StackEntry::Progress(ref mut progress)) => progress.next(),
            _ => {
                log::warn!("Can't next() while a span is top of the stack");
                None
            }
        };
        if let Some((_, result)) = maybe_result {
            self.stack.pop();
            let padding = "  ".repeat(self.stack.len());
            self.add_results(vec![format!("{}- {}", padding, result)]);
        }
    }

    fn add_results(&mut self, lines: Vec<String>) {
        match self.stack.last_mut() {
            Some(StackEntry::Span(ref mut s)) => s.nested_results.extend(lines),
            _ => self.results.extend(lines),
        }
    }
}

impl std::ops::Drop for Timer {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        // Close anything left open, innermost first
        while let Some(entry) = self.stack.last() {
            let name = match entry {
                StackEntry::Span(s) => s.name.clone(),
                StackEntry::Progress(_) => {
                    self.stack.pop();
                    continue;
                }
            };
            if name != self.outermost_name {
                log::warn!("Timer span {} was never stopped", name);
            }
            self.stop(&name);
        }

        for line in &self.results {
            log::info!("{}", line);
        }
        if !self.notes.is_empty() {
            log::info!("{} notes:", self.notes.len());
            for line in &self.notes {
                log::info!("{}", line);
            }
        }
        if !self.warnings.is_empty() {
            log::warn!("{} warnings:", self.warnings.len());
            for line in &self.warnings {
                log::warn!("{}", line);
            }
        }
    }
}
