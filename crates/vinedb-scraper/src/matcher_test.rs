use super::*;

const PAGE_URL: &str = "https://wines.example.com/?wine=chateau-exemple";

fn target(name: &str) -> MatchTarget {
    MatchTarget {
        names: vec![name.to_string()],
        ..MatchTarget::default()
    }
}

fn page(heading: &str, body: &str) -> ParsedPage {
    let html = format!("<html><body><main><h1>{heading}</h1>{body}</main></body></html>");
    ParsedPage::parse(&html, PAGE_URL)
}

const IMAGES: &str = r#"
    <img src="/theme/icons/logo.png" width="40" height="40">
    <img src="/assets/uploads/wine-label.jpg" width="200" height="800">
"#;

// ---------------------------------------------------------------------------
// Keyword extraction
// ---------------------------------------------------------------------------

#[test]
fn keywords_drop_short_tokens_and_fold_accents() {
    assert_eq!(
        keywords(&["Château d'Yquem 2015 (Sauternes)"]),
        vec!["chateau", "dyquem", "2015", "sauternes"]
    );
}

#[test]
fn keywords_include_chinese_names() {
    assert_eq!(
        keywords(&["Opus One", "作品一号酒庄"]),
        vec!["opus", "作品一号酒庄"]
    );
}

#[test]
fn normalize_collapses_punctuation() {
    assert_eq!(normalize("  Grange -- Bin 95! "), "grange bin 95");
}

// ---------------------------------------------------------------------------
// Direct-page rule
// ---------------------------------------------------------------------------

#[test]
fn unrelated_page_is_rejected_even_with_good_image() {
    let page = page("Unrelated Product X", IMAGES);
    let result = extract_candidate(&page, &target("Château Exemple"), &MatchConfig::default());
    match result {
        Err(Rejection::NoMatch(score)) => {
            assert_eq!(score.keyword_hits, 0);
            assert!(!score.prefix_match);
        }
        other => panic!("expected NoMatch, got: {other:?}"),
    }
}

#[test]
fn matching_page_selects_label_over_logo() {
    let page = page("Château Exemple 2020", IMAGES);
    let candidate =
        extract_candidate(&page, &target("Château Exemple"), &MatchConfig::default()).unwrap();
    let image = candidate.image_url.unwrap();
    assert_eq!(image, "https://wines.example.com/assets/uploads/wine-label.jpg");
    assert!(!image.contains("logo"));
}

#[test]
fn one_shared_word_is_not_enough_for_two_keyword_targets() {
    let page = page("Château Margaux", IMAGES);
    let verdict = evaluate_page(&page, &target("Château Exemple"), &MatchConfig::default());
    assert_eq!(verdict.keyword_hits, 1);
    assert!(!verdict.accepted());
}

#[test]
fn single_keyword_target_is_carried_by_its_full_name() {
    let page = page("Sassicaia 2018", IMAGES);
    let verdict = evaluate_page(&page, &target("Sassicaia"), &MatchConfig::default());
    assert_eq!(verdict.threshold, 20);
    assert_eq!(verdict.keyword_hits, 1);
    assert!(verdict.prefix_match);
    assert!(verdict.accepted());
}

#[test]
fn neighbouring_label_is_rejected_for_short_name() {
    let page = page(
        "Opus Two Reserve",
        r#"<img src="/uploads/opus-two.jpg" width="600" height="900">"#,
    );
    let verdict = evaluate_page(&page, &target("Opus One"), &MatchConfig::default());
    assert_eq!(verdict.keyword_hits, 1);
    assert!(!verdict.prefix_match);
    assert!(!verdict.accepted());
}

#[test]
fn long_prefix_rescues_partial_keyword_overlap() {
    let config = MatchConfig {
        min_keyword_hits: 3,
        ..MatchConfig::default()
    };
    let page = page("Chateau Exemple", "");
    let verdict = evaluate_page(&page, &target("Château Exemple Grand Vin"), &config);
    assert_eq!(verdict.keyword_hits, 2);
    assert!(verdict.prefix_match);
    assert!(verdict.accepted());
}

#[test]
fn name_without_keywords_relies_on_full_name() {
    let config = MatchConfig::default();
    let le_pin = target("Le Pin");
    assert!(!evaluate_page(&page("Pin Noir le Domaine", ""), &le_pin, &config).accepted());
    assert!(evaluate_page(&page("Le Pin 2015", ""), &le_pin, &config).accepted());
}

#[test]
fn lead_text_counts_toward_keyword_hits() {
    let page = page("Grand Vin", "<p>The flagship of Château Exemple.</p>");
    assert!(evaluate_page(&page, &target("Château Exemple"), &MatchConfig::default()).accepted());
}

#[test]
fn acceptance_is_monotonic_in_score() {
    let config = MatchConfig::default();
    let target = target("Penfolds Grange Shiraz");
    let verdicts: Vec<PageScore> = [
        "Something Else",
        "Penfolds Bin 389",
        "Penfolds Grange",
        "Penfolds Grange Shiraz 2016",
    ]
    .iter()
    .map(|h| evaluate_page(&page(h, ""), &target, &config))
    .collect();

    for a in &verdicts {
        for b in &verdicts {
            if a.score > b.score {
                assert!(
                    a.accepted() || !b.accepted(),
                    "higher score {a:?} rejected while lower {b:?} accepted"
                );
            }
        }
    }
}

#[test]
fn accepted_page_without_content_is_empty() {
    let page = page("Château Exemple", "<p>Coming soon.</p>");
    let result = extract_candidate(&page, &target("Château Exemple"), &MatchConfig::default());
    assert!(matches!(result, Err(Rejection::Empty(_))));
}

#[test]
fn text_without_image_is_usable() {
    let page = page(
        "Château Exemple",
        "<h2>Description</h2><p>Deep ruby.</p><h2>Tasting Notes</h2><p>Cassis.</p>\
         <p>Price: ¥1,280 | JS 96</p>",
    );
    let candidate =
        extract_candidate(&page, &target("Château Exemple"), &MatchConfig::default()).unwrap();
    assert!(candidate.image_url.is_none());
    assert_eq!(candidate.text.as_deref(), Some("Deep ruby."));
    assert_eq!(
        candidate.tasting_notes.as_deref(),
        Some("Cassis.\n\nPrice: ¥1,280 | JS 96")
    );
    assert_eq!(candidate.price, Some(Decimal::new(1280, 0)));
    assert_eq!(candidate.ratings.len(), 1);
    assert_eq!(candidate.url, PAGE_URL);
}

// ---------------------------------------------------------------------------
// Listing pages
// ---------------------------------------------------------------------------

const SEARCH_URL: &str = "https://wines.example.com/?s=Overture";

fn listing(links: &str) -> ParsedPage {
    let html = format!("<html><body><h1>Search results</h1><ul>{links}</ul></body></html>");
    ParsedPage::parse(&html, SEARCH_URL)
}

#[test]
fn best_link_ranks_first_and_weak_links_are_dropped() {
    let page = listing(
        r#"
        <li><a href="/?wine=cabernet-blend">Cabernet Blend</a></li>
        <li><a href="/?wine=overture-napa-valley">Overture Napa Valley</a></li>
        <li><a href="/?wine=opus-one-overture">Opus One Overture Napa Valley</a></li>
        "#,
    );
    let mut target = target("Overture Napa Valley");
    target.parent = Some("Opus One".to_string());
    let links = score_links(&page, &target, &MatchConfig::default());

    assert_eq!(links[0].url, "https://wines.example.com/?wine=opus-one-overture");
    assert_eq!(links[1].url, "https://wines.example.com/?wine=overture-napa-valley");
    assert!(!links.iter().any(|l| l.url.contains("cabernet")));
}

#[test]
fn other_parent_is_penalized() {
    let page = listing(
        r#"
        <li><a href="/?wine=penfolds-grange">Penfolds Grange Shiraz</a></li>
        <li><a href="/?wine=grange-shiraz">Grange Shiraz</a></li>
        "#,
    );
    let target = MatchTarget {
        names: vec!["Grange Shiraz".to_string()],
        parent: Some("Grange Estate".to_string()),
        other_parents: vec!["Penfolds".to_string(), "Grange Estate".to_string()],
    };
    let links = score_links(&page, &target, &MatchConfig::default());
    assert_eq!(links[0].url, "https://wines.example.com/?wine=grange-shiraz");
    let penalized = links.iter().find(|l| l.url.ends_with("penfolds-grange"));
    assert!(penalized.is_none_or(|l| l.score < links[0].score));
}

#[test]
fn equal_scores_keep_document_order() {
    let page = listing(
        r#"
        <li><a href="/?wine=a">Sassicaia</a></li>
        <li><a href="/?wine=b">Sassicaia</a></li>
        "#,
    );
    let links = score_links(&page, &target("Sassicaia"), &MatchConfig::default());
    assert_eq!(links.len(), 2);
    assert!(links[0].url.ends_with("wine=a"));
}

#[test]
fn offsite_and_self_links_are_ignored() {
    let page = listing(
        r#"
        <li><a href="https://elsewhere.example.org/sassicaia">Sassicaia</a></li>
        <li><a href="/?s=Overture">Sassicaia</a></li>
        "#,
    );
    assert!(score_links(&page, &target("Sassicaia"), &MatchConfig::default()).is_empty());
}
