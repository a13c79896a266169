#[cfg(test)]
mod scanner_tests {
    use std::rc::Rc;

    use shnap::error::ShnapError;
    use shnap::scanner::*;
    use shnap::source::LineIndex;
    use shnap::token::*;

    fn scan(source: &str) -> Vec<Result<Token<'_>, ShnapError>> {
        let index = LineIndex::new(source.as_bytes(), Rc::from("test"));
        Scanner::new(source, &index).collect()
    }

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let tokens: Vec<_> = scan(source).into_iter().filter_map(Result::ok).collect();

        assert_eq!(
            tokens.len(),
            expected.len(),
            "token count mismatch for {source:?}: {tokens:?}"
        );

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_punctuation() {
        assert_token_sequence(
            "({[.,:;]})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::COLON, ":"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators_longest_match() {
        assert_token_sequence(
            "a === b **= c = d",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::OPERATOR, "==="),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::OPERATOR, "**="),
                (TokenType::IDENTIFIER, "c"),
                (TokenType::EQUAL, "="),
                (TokenType::IDENTIFIER, "d"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "let fn obj lazy private final noimport elif voidish",
            &[
                (TokenType::LET, "let"),
                (TokenType::FN, "fn"),
                (TokenType::OBJ, "obj"),
                (TokenType::LAZY, "lazy"),
                (TokenType::PRIVATE, "private"),
                (TokenType::FINAL, "final"),
                (TokenType::NOIMPORT, "noimport"),
                (TokenType::ELIF, "elif"),
                (TokenType::IDENTIFIER, "voidish"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_negative_literal_only_in_operand_position() {
        assert_token_sequence(
            "x = -2 ** 2",
            &[
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::NUMBER, "-2"),
                (TokenType::OPERATOR, "**"),
                (TokenType::NUMBER, "2"),
                (TokenType::EOF, ""),
            ],
        );

        assert_token_sequence(
            "x -2",
            &[
                (TokenType::IDENTIFIER, "x"),
                (TokenType::OPERATOR, "-"),
                (TokenType::NUMBER, "2"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_number_forms() {
        assert_token_sequence(
            "12 1.5 1e3 7i 2d 3.25e-2",
            &[
                (TokenType::NUMBER, "12"),
                (TokenType::NUMBER, "1.5"),
                (TokenType::NUMBER, "1e3"),
                (TokenType::NUMBER, "7i"),
                (TokenType::NUMBER, "2d"),
                (TokenType::NUMBER, "3.25e-2"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_06_member_access_is_not_a_fraction() {
        assert_token_sequence(
            "xs.len",
            &[
                (TokenType::IDENTIFIER, "xs"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "len"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_07_string_escapes_and_raw_strings() {
        let results = scan(r#""a\tb\u{41}" """raw \n"""  'x' '\n'"#);
        let tokens: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "a\tbA"),
            other => panic!("expected string, got {other:?}"),
        }
        match &tokens[1].token_type {
            TokenType::STRING(s) => assert_eq!(s, "raw \\n"),
            other => panic!("expected raw string, got {other:?}"),
        }
        match &tokens[2].token_type {
            TokenType::CHAR(c) => assert_eq!(*c, 'x'),
            other => panic!("expected char, got {other:?}"),
        }
        match &tokens[3].token_type {
            TokenType::CHAR(c) => assert_eq!(*c, '\n'),
            other => panic!("expected char, got {other:?}"),
        }
        assert_eq!(tokens[4].token_type, TokenType::EOF);
    }

    #[test]
    fn test_scanner_08_comment_is_skipped() {
        assert_token_sequence(
            "a // trailing words\nb",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let results = scan(",.$(#");

        // 0: COMMA, 1: DOT, 2: error '$', 3: LEFT_PAREN, 4: error '#', 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                err
            );
        }
    }

    #[test]
    fn test_unterminated_string_reports_location() {
        let results = scan("\n  \"open");
        let err = results
            .iter()
            .find_map(|r| r.as_ref().err())
            .expect("an unterminated string is an error");

        let location = err.location().expect("lex errors carry a location");
        assert_eq!((location.line, location.column), (2, 3));
    }

    #[test]
    fn test_char_literal_must_be_single() {
        let results = scan("'ab'");
        assert!(results.iter().any(|r| r.is_err()));
    }

    fn assert_token_matches(
        result: &Result<Token<'_>, ShnapError>,
        expected_type: TokenType,
        expected_lexeme: &str,
    ) {
        let token = result.as_ref().expect("Expected a token");
        assert_eq!(token.token_type, expected_type);
        assert_eq!(token.lexeme, expected_lexeme);
    }
}
