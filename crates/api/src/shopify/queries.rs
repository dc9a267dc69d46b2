//! GraphQL documents and response shapes for the Admin API.

use serde::Deserialize;

use super::DiscountSummary;

/// Code discounts with the first code of each discount type that has codes.
pub const DISCOUNTS_QUERY: &str = r"
query discounts($first: Int!) {
  codeDiscountNodes(first: $first) {
    edges {
      node {
        id
        codeDiscount {
          ... on DiscountCodeBasic {
            codes(first: 1) { edges { node { code } } }
          }
          ... on DiscountCodeBxgy {
            codes(first: 1) { edges { node { code } } }
          }
          ... on DiscountCodeFreeShipping {
            codes(first: 1) { edges { node { code } } }
          }
        }
      }
    }
  }
}
";

/// Variables for [`DISCOUNTS_QUERY`].
#[derive(Debug, serde::Serialize)]
pub struct DiscountsVariables {
    pub first: u32,
}

/// `data` of a [`DISCOUNTS_QUERY`] response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountsData {
    code_discount_nodes: Connection<DiscountNode>,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscountNode {
    id: String,
    #[serde(default)]
    code_discount: Option<CodeDiscount>,
}

/// Discount types outside the query's fragments decode with no codes.
#[derive(Debug, Deserialize)]
struct CodeDiscount {
    #[serde(default)]
    codes: Option<Connection<DiscountCodeNode>>,
}

#[derive(Debug, Deserialize)]
struct DiscountCodeNode {
    code: String,
}

impl DiscountsData {
    /// Flatten into summaries, dropping discounts without a code.
    #[must_use]
    pub fn into_summaries(self) -> Vec<DiscountSummary> {
        self.code_discount_nodes
            .edges
            .into_iter()
            .filter_map(|edge| {
                let node = edge.node;
                let code = node
                    .code_discount?
                    .codes?
                    .edges
                    .into_iter()
                    .next()?
                    .node
                    .code;
                Some(DiscountSummary { id: node.id, code })
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_into_summaries() {
        let data: DiscountsData = serde_json::from_value(serde_json::json!({
            "codeDiscountNodes": {
                "edges": [
                    {"node": {"id": "gid://shopify/DiscountCodeNode/1", "codeDiscount": {
                        "codes": {"edges": [{"node": {"code": "SAVE10"}}]}
                    }}},
                    {"node": {"id": "gid://shopify/DiscountCodeNode/2", "codeDiscount": {}}},
                    {"node": {"id": "gid://shopify/DiscountCodeNode/3", "codeDiscount": {
                        "codes": {"edges": []}
                    }}},
                    {"node": {"id": "gid://shopify/DiscountCodeNode/4", "codeDiscount": {
                        "codes": {"edges": [{"node": {"code": "FREESHIP"}}]}
                    }}}
                ]
            }
        }))
        .unwrap();

        assert_eq!(
            data.into_summaries(),
            vec![
                DiscountSummary {
                    id: "gid://shopify/DiscountCodeNode/1".to_string(),
                    code: "SAVE10".to_string(),
                },
                DiscountSummary {
                    id: "gid://shopify/DiscountCodeNode/4".to_string(),
                    code: "FREESHIP".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_query_names_all_code_discount_types() {
        for fragment in [
            "DiscountCodeBasic",
            "DiscountCodeBxgy",
            "DiscountCodeFreeShipping",
        ] {
            assert!(DISCOUNTS_QUERY.contains(fragment));
        }
    }
}
