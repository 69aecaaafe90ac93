//! End-to-end scenarios exercising the public API.

use earlex::lexer::interval::{resolve_merging, Interval};
use earlex::{Domain, EarleyParser, Error, Grammar, GrammarBuilder, Result, Token};

fn tokens(g: &Grammar, names: &[&str]) -> Vec<Result<Token>> {
    let mut out: Vec<Result<Token>> = names
        .iter()
        .map(|n| Ok(Token::new(g.particle_by_name(n).unwrap(), *n)))
        .collect();
    out.push(Ok(Token::new(g.bottom(), "")));
    out
}

#[test]
fn simple_bnf_grammar() {
    let g = GrammarBuilder::new()
        .name("simple-bnf")
        .terminals(&["NONTERM", "COLEQ", "PIPE", "IDENTIFIER"])
        .nonterminals(&["bnf", "ntdecl", "def", "ntort"])
        .rule("bnf", &["ntdecl"])
        .rule("bnf", &["ntdecl", "bnf"])
        .rule("ntdecl", &["NONTERM", "COLEQ", "def"])
        .rule("ntdecl", &["ntdecl", "PIPE", "def"])
        .rule("def", &["ntort"])
        .rule("def", &["ntort", "def"])
        .rule("ntort", &["IDENTIFIER"])
        .rule("ntort", &["NONTERM"])
        .rule("`*", &["bnf", "`."])
        .build()
        .unwrap();

    let parser = EarleyParser::generate(&g).unwrap();
    let input = tokens(
        &g,
        &["NONTERM", "COLEQ", "IDENTIFIER", "PIPE", "NONTERM", "IDENTIFIER"],
    );
    let tree = parser.parse(input).unwrap();

    assert_eq!(g.particle_name(tree.particle), "bnf");
    assert_eq!(tree.children.len(), 1);
    let decl = &tree.children[0];
    assert_eq!(g.particle_name(decl.particle), "ntdecl");
    // One declaration holding two PIPE-joined alternatives.
    assert_eq!(decl.children.len(), 3);
    assert_eq!(g.particle_name(decl.children[0].particle), "ntdecl");
    assert_eq!(g.particle_name(decl.children[1].particle), "PIPE");
    assert_eq!(g.particle_name(decl.children[2].particle), "def");
}

#[test]
fn nullable_quadruple() {
    let g = GrammarBuilder::new()
        .name("a4")
        .terminals(&["a"])
        .nonterminals(&["S", "A", "E"])
        .rule("`*", &["S", "`."])
        .rule("S", &["A", "A", "A", "A"])
        .rule("A", &["a"])
        .rule("A", &["E"])
        .rule("E", &["`e"])
        .build()
        .unwrap();

    let parser = EarleyParser::generate(&g).unwrap();
    let tree = parser.parse(tokens(&g, &["a"])).unwrap();

    assert_eq!(g.particle_name(tree.particle), "S");
    assert_eq!(tree.children.len(), 4);
    let mut empty = 0;
    for child in &tree.children {
        assert_eq!(g.particle_name(child.particle), "A");
        if child.tokens().is_empty() {
            empty += 1;
        }
    }
    assert_eq!(empty, 3);
}

#[test]
fn lexer_ignore_and_block_forwarding() {
    let g = GrammarBuilder::new()
        .name("commented")
        .terminals(&["COMMENT_OPEN", "COMMENT", "NL", "IDENT"])
        .nonterminals(&["s"])
        .rule("s", &["IDENT"])
        .rule("`*", &["s", "`."])
        .build()
        .unwrap();

    let lexer = Domain::builder(&g)
        .block("0")
        .ignore_src("[ \\t\\n]+")
        .termdef_src("COMMENT_OPEN", "\\/\\/")
        .to_block("comment")
        .termdef_src("IDENT", "[a-z]+")
        .block("comment")
        .termdef_src("NL", "\\n")
        .to_block("0")
        .termdef_src("COMMENT", "[^\\n]+")
        .build()
        .unwrap()
        .compile()
        .unwrap();

    let toks = lexer.tokenize("abc // ignore\n xyz").unwrap();
    let got: Vec<(String, String)> = toks
        .iter()
        .filter(|t| !t.terminal.is_bottom())
        .map(|t| (g.particle_name(t.terminal).to_string(), t.literal.clone()))
        .collect();
    assert_eq!(
        got,
        vec![
            ("IDENT".to_string(), "abc".to_string()),
            ("COMMENT_OPEN".to_string(), "//".to_string()),
            ("COMMENT".to_string(), " ignore".to_string()),
            ("NL".to_string(), "\n".to_string()),
            ("IDENT".to_string(), "xyz".to_string()),
        ]
    );
}

#[test]
fn maximal_munch_tie_break() {
    let g = GrammarBuilder::new()
        .name("kw")
        .terminals(&["KW", "IDENT"])
        .nonterminals(&["s"])
        .rule("s", &["KW"])
        .rule("`*", &["s", "`."])
        .build()
        .unwrap();

    let lexer = Domain::builder(&g)
        .block("0")
        .termdef_src("KW", "if")
        .termdef_src("IDENT", "[a-z]+")
        .build()
        .unwrap()
        .compile()
        .unwrap();

    let toks = lexer.tokenize("ifx").unwrap();
    assert_eq!(g.particle_name(toks[0].terminal), "IDENT");
    assert_eq!(toks[0].literal, "ifx");
    assert_eq!(toks.len(), 2);

    let toks = lexer.tokenize("if").unwrap();
    assert_eq!(g.particle_name(toks[0].terminal), "KW");
}

#[test]
fn interval_merge_by_priority() {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum P {
        C,
        A,
        B,
    }
    let inputs = vec![
        Interval::new(2, 4, P::C),
        Interval::new(4, 8, P::A),
        Interval::new(6, 10, P::B),
    ];
    let merged = resolve_merging(&inputs, |a, b| *a.max(b));
    // The partition is disjoint and every cell carries the winning
    // priority; adjacency merging is allowed.
    assert_eq!(
        merged,
        vec![
            Interval::new(2, 3, P::C),
            Interval::new(4, 5, P::A),
            Interval::new(6, 10, P::B),
        ]
    );
}

#[test]
fn parse_failure_reports_position_and_expectations() {
    let g = GrammarBuilder::new()
        .name("pair")
        .terminals(&["X", "Y"])
        .nonterminals(&["s"])
        .rule("s", &["X", "Y"])
        .rule("`*", &["s", "`."])
        .build()
        .unwrap();
    let parser = EarleyParser::generate(&g).unwrap();
    let err = parser.parse(tokens(&g, &["X", "X"])).unwrap_err();
    match err {
        Error::Parse {
            token_index,
            last_token,
            expected,
        } => {
            assert_eq!(token_index, 1);
            assert!(last_token.unwrap().starts_with("X"));
            assert_eq!(expected, vec!["Y".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn empty_input_of_nullable_grammar() {
    let g = GrammarBuilder::new()
        .name("maybe")
        .terminals(&["x"])
        .nonterminals(&["S"])
        .rule("S", &["x"])
        .rule("S", &["`e"])
        .rule("`*", &["S", "`."])
        .build()
        .unwrap();
    let parser = EarleyParser::generate(&g).unwrap();

    let tree = parser.parse(tokens(&g, &[])).unwrap();
    assert_eq!(g.particle_name(tree.particle), "S");
    assert!(tree.tokens().is_empty());

    let tree = parser.parse(tokens(&g, &["x"])).unwrap();
    assert_eq!(tree.tokens().len(), 1);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn word_lexer(g: &Grammar) -> earlex::Lexer {
        Domain::builder(g)
            .block("0")
            .ignore_src(" +")
            .termdef_src("WORD", "[a-z]+")
            .termdef_src("NUM", "0|[1-9][0-9]*")
            .build()
            .unwrap()
            .compile()
            .unwrap()
    }

    fn word_grammar() -> Grammar {
        GrammarBuilder::new()
            .name("words")
            .terminals(&["WORD", "NUM"])
            .nonterminals(&["s"])
            .rule("s", &["WORD"])
            .rule("`*", &["s", "`."])
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn lexing_recovers_every_word(words in proptest::collection::vec("[a-z]{1,8}", 1..8)) {
            let g = word_grammar();
            let lexer = word_lexer(&g);
            let input = words.join(" ");
            let toks = lexer.tokenize(&input).unwrap();
            let got: Vec<String> = toks
                .iter()
                .filter(|t| !t.terminal.is_bottom())
                .map(|t| t.literal.clone())
                .collect();
            prop_assert_eq!(got, words);
        }

        #[test]
        fn token_positions_cover_their_literals(words in proptest::collection::vec("[a-z]{1,8}", 1..8)) {
            let g = word_grammar();
            let lexer = word_lexer(&g);
            let input = words.join(" ");
            let chars: Vec<char> = input.chars().collect();
            for tok in lexer.tokenize(&input).unwrap() {
                if tok.terminal.is_bottom() {
                    continue;
                }
                let covered: String = chars[tok.first_pos..=tok.last_pos].iter().collect();
                prop_assert_eq!(covered, tok.literal.clone());
            }
        }
    }
}
