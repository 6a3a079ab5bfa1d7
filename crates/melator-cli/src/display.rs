use melator_core::analyzer::{AnalysisResult, RecommendationTally};
use melator_core::checker::{CheckResult, SideGameResult};
use melator_core::draw::{DrawRecord, GameKind};
use melator_core::explorer::{DrawSummary, Page};
use melator_core::generator::{GenerationOutcome, TicketReport};
use melator_core::stats::{GroupCount, Stats};
use melator_core::temperature::{NumberTemperature, ScoreTier, StreakBucket};

fn format_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{n:2}"))
        .collect::<Vec<_>>()
        .join(" - ")
}

fn format_date(draw: &DrawRecord) -> String {
    draw.date
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "—".to_string())
}

fn rule(title: &str) {
    println!("\n── {title} ──");
}

pub fn display_stats(stats: &Stats, top: usize) {
    println!(
        "Statistics over {} complete draws ({} in history)",
        stats.complete_draws,
        stats.history.len()
    );
    if let Some(latest) = stats.latest_draw() {
        println!(
            "Latest draw: {} ({})  {}",
            latest.draw_id,
            format_date(latest),
            format_numbers(&latest.main_numbers)
        );
    }

    let ranked = stats.frequency.ranked();
    rule("Most drawn");
    for (n, count) in ranked.iter().take(top) {
        println!("  {n:2}  {count:4}  (recent {})", stats.recent_frequency.get(*n));
    }
    rule("Least drawn");
    for (n, count) in ranked.iter().rev().take(top) {
        println!("  {n:2}  {count:4}  (recent {})", stats.recent_frequency.get(*n));
    }

    rule("Top pairs");
    for pair in stats.pairs.top(top) {
        println!("  {}  {:4}", format_numbers(&pair.numbers), pair.count);
    }
    rule("Top trios");
    for trio in stats.trios.top(top) {
        println!("  {}  {:4}", format_numbers(&trio.numbers), trio.count);
    }

    let repeated: Vec<_> = stats
        .repeated_combinations
        .iter()
        .filter(|c| c.count > 1)
        .collect();
    rule("Repeated combinations");
    if repeated.is_empty() {
        println!("  none");
    }
    for combo in repeated.iter().take(top) {
        println!("  {}  x{}", format_numbers(&combo.numbers), combo.count);
    }

    let dist = &stats.distributions;
    rule("Distributions");
    println!(
        "  Sum: mean {:.1}, stddev {:.1}, ideal {:.0}-{:.0}",
        dist.sum_stats.mean,
        dist.sum_stats.stddev,
        dist.sum_stats.ideal_range.low,
        dist.sum_stats.ideal_range.high
    );
    println!(
        "  Average gap: mean {:.2}, ideal {:.2}-{:.2}",
        dist.gap_stats.mean_gap, dist.gap_stats.ideal_range.low, dist.gap_stats.ideal_range.high
    );
    println!("  Parity:");
    for (key, percent) in by_percent(&dist.parity_distribution) {
        println!("    {key:6} {percent:5.1}%");
    }
    println!("  High/low:");
    for (key, percent) in by_percent(&dist.high_low_distribution) {
        println!("    {key:6} {percent:5.1}%");
    }
    println!("  Common decade patterns:");
    for pattern in &dist.common_decade_patterns {
        println!("    {pattern}");
    }
}

pub fn display_number_groups(
    number: u8,
    frequency: u32,
    pairs: &[&GroupCount<2>],
    trios: &[&GroupCount<3>],
) {
    println!("Number {number}: drawn {frequency} times");
    rule(&format!("Pairs with {number}"));
    if pairs.is_empty() {
        println!("  none");
    }
    for pair in pairs {
        println!("  {}  {:4}", format_numbers(&pair.numbers), pair.count);
    }
    rule(&format!("Trios with {number}"));
    if trios.is_empty() {
        println!("  none");
    }
    for trio in trios {
        println!("  {}  {:4}", format_numbers(&trio.numbers), trio.count);
    }
}

fn by_percent(map: &std::collections::BTreeMap<String, f64>) -> Vec<(&str, f64)> {
    let mut rows: Vec<(&str, f64)> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(b.0)));
    rows
}

pub fn display_generation(outcome: &GenerationOutcome) {
    println!(
        "Generated: {}  (after {} attempts)",
        format_numbers(&outcome.numbers),
        outcome.attempts
    );
    match &outcome.report {
        TicketReport::Single(analysis) => display_analysis(analysis),
        TicketReport::Multiple(tally) => display_tally(&outcome.numbers, tally),
    }
}

pub fn display_analysis(result: &AnalysisResult) {
    rule(&format!("Analysis of {}", format_numbers(&result.numbers)));
    println!(
        "  Sum        {:4}   ideal {:.0}-{:.0}   {}",
        result.sum.value, result.sum.ideal_range.low, result.sum.ideal_range.high, result.sum.verdict
    );
    println!(
        "  Parity     {:6} {:5.1}%   {}",
        result.parity.key, result.parity.percent, result.parity.verdict
    );
    println!(
        "  High/low   {:6} {:5.1}%   {}",
        result.high_low.key, result.high_low.percent, result.high_low.verdict
    );
    println!(
        "  Decades    {}   {}",
        result.decade.signature, result.decade.verdict
    );
    println!(
        "  Avg gap    {:.2}   ideal {:.2}-{:.2}   {}",
        result.gap.value, result.gap.ideal_range.low, result.gap.ideal_range.high, result.gap.verdict
    );
    println!("  Score      {}   {}", result.score, result.recommendation);
}

pub fn display_tally(numbers: &[u8], tally: &RecommendationTally) {
    rule(&format!(
        "{}-number ticket {}",
        numbers.len(),
        format_numbers(numbers)
    ));
    println!("  {} combinations", tally.total());
    println!("  Statistically Strong  {:4}", tally.strong);
    println!("  Balanced              {:4}", tally.balanced);
    println!("  Risky (Atypical)      {:4}", tally.risky);
}

fn side_game_line(kind: GameKind, result: Option<&SideGameResult>) {
    match result {
        Some(side) if side.won => println!("  {kind}: 6 hits, winner"),
        Some(side) => println!(
            "  {kind}: {} hits {}",
            side.hits.len(),
            if side.hits.is_empty() {
                String::new()
            } else {
                format!("({})", format_numbers(&side.hits))
            }
        ),
        None => println!("  {kind}: not played in this draw"),
    }
}

pub fn display_check(result: &CheckResult) {
    let date = result
        .date
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "—".to_string());
    rule(&format!("Draw {} ({date})", result.draw_id));
    let prize = result
        .main_prize
        .map(|p| p.to_string())
        .unwrap_or_else(|| "no prize".to_string());
    println!(
        "  {}: {} hits {}  {prize}",
        GameKind::Main,
        result.main_display(),
        if result.main_hits.is_empty() {
            String::new()
        } else {
            format!("({})", format_numbers(&result.main_hits))
        }
    );
    side_game_line(GameKind::Secondary, result.secondary.as_ref());
    side_game_line(GameKind::Tertiary, result.tertiary.as_ref());
    if result.is_winner() {
        println!("  This play wins.");
    }
}

pub fn display_historical_hits(play: &[u8], hits: &[CheckResult]) {
    println!(
        "Play {} matched something in {} draws",
        format_numbers(play),
        hits.len()
    );
    let winners: Vec<&CheckResult> = hits.iter().filter(|h| h.is_winner()).collect();
    if winners.is_empty() {
        println!("No prize in any recorded draw.");
        return;
    }
    for result in winners {
        display_check(result);
    }
}

pub fn display_history(page: &Page<&DrawRecord>) {
    if page.items.is_empty() {
        println!("No draws to show.");
        return;
    }
    println!(
        "{:>6}  {:10}  {:27}  {:>5}",
        "Draw", "Date", "Numbers", "Bonus"
    );
    for draw in &page.items {
        println!(
            "{:>6}  {:10}  {:27}  {:>5}",
            draw.draw_id,
            format_date(draw),
            format_numbers(&draw.main_numbers),
            draw.bonus_number.map(|b| b.to_string()).unwrap_or_default()
        );
    }
    println!(
        "Page {} of {} ({} draws)",
        page.page, page.total_pages, page.total_items
    );
}

pub fn display_draw(draw: &DrawRecord, summary: &DrawSummary, stats: &Stats) {
    rule(&format!("Draw {} ({})", draw.draw_id, format_date(draw)));
    for kind in [GameKind::Main, GameKind::Secondary, GameKind::Tertiary] {
        match draw.numbers_for(kind) {
            Some(numbers) if !numbers.is_empty() => {
                println!("  {:10} {}", kind.label(), format_numbers(numbers))
            }
            _ => println!("  {:10} —", kind.label()),
        }
    }
    if let Some(bonus) = draw.bonus_number {
        println!("  Bonus      {bonus}");
    }
    if !draw.is_complete() {
        println!("  (incomplete draw, left out of the statistics)");
    }
    println!(
        "  Sum {}, {} even, {} low",
        summary.sum, summary.even, summary.low
    );

    println!("  Numbers today:");
    for &n in &draw.main_numbers {
        if let Some(entry) = stats.predictive_entry(n) {
            println!(
                "    {n:2}  drawn {:4}x  cold {:3}  {}  score {}",
                stats.frequency.get(n),
                entry.cold_streak,
                entry.trend,
                entry.composite_score
            );
        }
    }
}

pub fn display_temperatures(temperatures: &[NumberTemperature]) {
    rule("By cold streak");
    for bucket in StreakBucket::ALL {
        let mut numbers: Vec<u8> = temperatures
            .iter()
            .filter(|t| t.bucket == bucket)
            .map(|t| t.number)
            .collect();
        numbers.sort_unstable();
        let list = if numbers.is_empty() {
            "—".to_string()
        } else {
            format_numbers(&numbers)
        };
        println!("  {:28} {list}", bucket.label());
    }

    rule("By composite score");
    for tier in [ScoreTier::Top, ScoreTier::High, ScoreTier::Medium, ScoreTier::Low] {
        let entries: Vec<String> = temperatures
            .iter()
            .filter(|t| t.tier == tier)
            .map(|t| format!("{}({})", t.number, t.composite_score))
            .collect();
        println!("  {:7} {}", tier.to_string(), entries.join(" "));
    }
}
