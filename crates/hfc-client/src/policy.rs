//! Endorsement policy expressions.
//!
//! Parses the policy language used when instantiating chaincode or
//! approving a chaincode definition:
//!
//! ```text
//! OR('Org1MSP.member', AND('Org2MSP.peer', 'Org3MSP.admin'))
//! OutOf(2, 'Org1MSP.member', 'Org2MSP.member', 'Org3MSP.member')
//! ```
//!
//! Every principal occurrence gets its own identity entry, in order of
//! appearance, and is referenced by that index from the rule tree. A
//! repeated principal is listed once per occurrence.

use crate::error::{ClientError, Result};
use hfc_types::common::{SignaturePolicy, SignaturePolicyEnvelope};
use hfc_types::msp::{MspPrincipal, MspRole, MspRoleType, PrincipalClassification};
use hfc_types::Message;

/// Parses a policy expression into a signature policy envelope.
///
/// # Errors
///
/// Returns [`ClientError::InvalidPolicy`] on syntax errors, unknown
/// functions or roles, and thresholds larger than the rule count.
///
/// ```
/// use hfc_client::policy::parse_policy;
///
/// let envelope = parse_policy("OR('Org1MSP.member', 'Org2MSP.member')").unwrap();
/// assert_eq!(envelope.identities.len(), 2);
/// ```
pub fn parse_policy(expression: &str) -> Result<SignaturePolicyEnvelope> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        principals: Vec::new(),
    };
    let rule = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(invalid(format!("unexpected {token:?} after expression")));
    }
    Ok(SignaturePolicyEnvelope {
        version: 0,
        rule: Some(rule),
        identities: parser
            .principals
            .into_iter()
            .map(|(msp, role)| role_principal(msp, role))
            .collect(),
    })
}

/// A policy satisfied by any member of `msp_id`.
pub fn signed_by_msp_member(msp_id: &str) -> SignaturePolicyEnvelope {
    SignaturePolicyEnvelope {
        version: 0,
        rule: Some(SignaturePolicy::n_out_of(1, vec![SignaturePolicy::signed_by(0)])),
        identities: vec![role_principal(msp_id.to_string(), MspRoleType::Member)],
    }
}

fn role_principal(msp_identifier: String, role: MspRoleType) -> MspPrincipal {
    MspPrincipal {
        principal_classification: PrincipalClassification::Role as i32,
        principal: MspRole {
            msp_identifier,
            role: role as i32,
        }
        .encode_to_vec(),
    }
}

fn invalid(message: impl Into<String>) -> ClientError {
    ClientError::InvalidPolicy(message.into())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Quoted(String),
    Number(i32),
    Open,
    Close,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((at, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            ',' => tokens.push(Token::Comma),
            '\'' | '"' => {
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, q)) if q == c => break,
                        Some((_, ch)) => text.push(ch),
                        None => return Err(invalid(format!("unterminated quote at {at}"))),
                    }
                }
                tokens.push(Token::Quoted(text));
            }
            c if c.is_ascii_digit() => {
                let mut digits = c.to_string();
                while let Some(&(_, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                let n = digits
                    .parse()
                    .map_err(|_| invalid(format!("number out of range: {digits}")))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() => {
                let mut ident = c.to_string();
                while let Some(&(_, d)) = chars.peek() {
                    if !d.is_ascii_alphanumeric() {
                        break;
                    }
                    ident.push(d);
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(invalid(format!("unexpected character {other:?} at {at}"))),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    principals: Vec<(String, MspRoleType)>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| invalid("unexpected end of expression"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        let token = self.next()?;
        if token != expected {
            return Err(invalid(format!("expected {expected:?}, found {token:?}")));
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<SignaturePolicy> {
        match self.next()? {
            Token::Quoted(principal) => self.principal(&principal),
            Token::Ident(function) => self.function(&function),
            other => Err(invalid(format!("unexpected {other:?}"))),
        }
    }

    fn function(&mut self, name: &str) -> Result<SignaturePolicy> {
        self.expect(Token::Open)?;
        let threshold = match name.to_ascii_lowercase().as_str() {
            "and" => None,
            "or" => Some(1),
            "outof" => {
                let n = match self.next()? {
                    Token::Number(n) if n > 0 => n,
                    other => return Err(invalid(format!("OutOf needs a positive count, found {other:?}"))),
                };
                self.expect(Token::Comma)?;
                Some(n)
            }
            _ => return Err(invalid(format!("unknown function {name}"))),
        };

        let mut rules = vec![self.expression()?];
        loop {
            match self.next()? {
                Token::Comma => rules.push(self.expression()?),
                Token::Close => break,
                other => return Err(invalid(format!("expected ',' or ')', found {other:?}"))),
            }
        }

        let n = threshold.unwrap_or(rules.len() as i32);
        if n as usize > rules.len() {
            return Err(invalid(format!(
                "threshold {n} exceeds {} rules",
                rules.len()
            )));
        }
        Ok(SignaturePolicy::n_out_of(n, rules))
    }

    fn principal(&mut self, text: &str) -> Result<SignaturePolicy> {
        let (msp, role) = text
            .rsplit_once('.')
            .ok_or_else(|| invalid(format!("principal {text:?} is not MSP.role")))?;
        if msp.is_empty() {
            return Err(invalid(format!("principal {text:?} has no MSP")));
        }
        let role = MspRoleType::from_policy_name(role)
            .ok_or_else(|| invalid(format!("unknown role {role:?} in {text:?}")))?;

        self.principals.push((msp.to_string(), role));
        Ok(SignaturePolicy::signed_by(self.principals.len() as i32 - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfc_types::common::signature_policy::Type;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn roles(envelope: &SignaturePolicyEnvelope) -> Vec<(String, i32)> {
        envelope
            .identities
            .iter()
            .map(|p| {
                let role = MspRole::decode(p.principal.as_slice()).unwrap();
                (role.msp_identifier, role.role)
            })
            .collect()
    }

    fn n_out_of(policy: &SignaturePolicy) -> (i32, &[SignaturePolicy]) {
        match policy.r#type.as_ref().unwrap() {
            Type::NOutOf(n) => (n.n, n.rules.as_slice()),
            Type::SignedBy(_) => panic!("expected NOutOf"),
        }
    }

    #[test]
    fn test_or() {
        let envelope = parse_policy("OR('Org1MSP.member', 'Org2MSP.peer')").unwrap();
        assert_eq!(envelope.version, 0);
        assert_eq!(
            roles(&envelope),
            vec![
                ("Org1MSP".to_string(), MspRoleType::Member as i32),
                ("Org2MSP".to_string(), MspRoleType::Peer as i32),
            ]
        );
        let (n, rules) = n_out_of(envelope.rule.as_ref().unwrap());
        assert_eq!(n, 1);
        assert_eq!(
            rules,
            &[SignaturePolicy::signed_by(0), SignaturePolicy::signed_by(1)]
        );
    }

    #[test]
    fn test_nested() {
        let envelope =
            parse_policy("and('A.member', OR('B.admin', \"A.member\"), OutOf(1, 'C.client'))")
                .unwrap();
        assert_eq!(
            roles(&envelope),
            vec![
                ("A".to_string(), MspRoleType::Member as i32),
                ("B".to_string(), MspRoleType::Admin as i32),
                ("A".to_string(), MspRoleType::Member as i32),
                ("C".to_string(), MspRoleType::Client as i32),
            ]
        );

        let (n, rules) = n_out_of(envelope.rule.as_ref().unwrap());
        assert_eq!(n, 3);
        assert_eq!(rules[0], SignaturePolicy::signed_by(0));
        let (inner_n, inner) = n_out_of(&rules[1]);
        assert_eq!(inner_n, 1);
        assert_eq!(
            inner,
            &[SignaturePolicy::signed_by(1), SignaturePolicy::signed_by(2)]
        );
        let (out_n, out) = n_out_of(&rules[2]);
        assert_eq!(out_n, 1);
        assert_eq!(out, &[SignaturePolicy::signed_by(3)]);
    }

    #[test]
    fn test_repeated_principal_is_listed_per_occurrence() {
        let envelope = parse_policy("AND('A.member','A.member')").unwrap();
        assert_eq!(envelope.identities.len(), 2);
        assert_eq!(envelope.identities[0], envelope.identities[1]);

        let expected = SignaturePolicyEnvelope {
            version: 0,
            rule: Some(SignaturePolicy::n_out_of(
                2,
                vec![SignaturePolicy::signed_by(0), SignaturePolicy::signed_by(1)],
            )),
            identities: vec![
                role_principal("A".to_string(), MspRoleType::Member),
                role_principal("A".to_string(), MspRoleType::Member),
            ],
        };
        assert_eq!(
            parse_policy("AND('A.member','A.member')").unwrap().encode_to_vec(),
            expected.encode_to_vec()
        );
    }

    #[test]
    fn test_msp_with_dots() {
        let envelope = parse_policy("'org1.example.com.admin'").unwrap();
        assert_eq!(
            roles(&envelope),
            vec![("org1.example.com".to_string(), MspRoleType::Admin as i32)]
        );
        assert_eq!(envelope.rule, Some(SignaturePolicy::signed_by(0)));
    }

    #[test]
    fn test_errors() {
        for bad in [
            "",
            "OR(",
            "OR('A.member'",
            "OR('A.member',)",
            "XOR('A.member')",
            "OR('A.boss')",
            "OR('Amember')",
            "OR('.member')",
            "OutOf(3, 'A.member', 'B.member')",
            "OutOf(0, 'A.member')",
            "OR('A.member') 'B.member'",
            "OR('A.member)",
            "OR('A.member'; 'B.member')",
        ] {
            assert!(
                matches!(parse_policy(bad), Err(ClientError::InvalidPolicy(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_signed_by_msp_member() {
        let envelope = signed_by_msp_member("Org1MSP");
        assert_eq!(
            roles(&envelope),
            vec![("Org1MSP".to_string(), MspRoleType::Member as i32)]
        );
        assert_eq!(parse_policy("OutOf(1, 'Org1MSP.member')").unwrap(), envelope);
    }

    proptest! {
        #[test]
        fn one_identity_per_occurrence(
            msps in proptest::collection::vec(0usize..4, 1..12),
        ) {
            let names: Vec<String> = msps.iter().map(|i| format!("'Org{i}MSP.member'")).collect();
            let envelope = parse_policy(&format!("OR({})", names.join(", "))).unwrap();
            prop_assert_eq!(envelope.identities.len(), msps.len());

            let (_, rules) = n_out_of(envelope.rule.as_ref().unwrap());
            for (index, rule) in rules.iter().enumerate() {
                prop_assert_eq!(rule, &SignaturePolicy::signed_by(index as i32));
            }
            let listed: Vec<String> = roles(&envelope).into_iter().map(|(msp, _)| msp).collect();
            let expected: Vec<String> = msps.iter().map(|i| format!("Org{i}MSP")).collect();
            prop_assert_eq!(listed, expected);
        }
    }
}
