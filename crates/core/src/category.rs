use serde::{Deserialize, Serialize};

/// Fixed spending category vocabulary shared by both import pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Food,
    Transport,
    Shopping,
    Entertainment,
    Healthcare,
    Bills,
    Income,
    Other,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Food => "food",
            Category::Transport => "transport",
            Category::Shopping => "shopping",
            Category::Entertainment => "entertainment",
            Category::Healthcare => "healthcare",
            Category::Bills => "bills",
            Category::Income => "income",
            Category::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "food" => Ok(Category::Food),
            "transport" => Ok(Category::Transport),
            "shopping" => Ok(Category::Shopping),
            "entertainment" => Ok(Category::Entertainment),
            "healthcare" => Ok(Category::Healthcare),
            "bills" => Ok(Category::Bills),
            "income" => Ok(Category::Income),
            "other" => Ok(Category::Other),
            other => Err(format!("Unknown category: '{other}'")),
        }
    }
}

impl Category {
    /// Map a free-text category suggestion (e.g. from model output) onto the
    /// fixed vocabulary. Case-insensitive keyword match, `Other` when nothing
    /// fits. Understands both English and Portuguese labels.
    pub fn from_keyword(s: &str) -> Category {
        let s = s.trim().to_lowercase();
        const LABELS: &[(&[&str], Category)] = &[
            (&["food", "aliment", "restaurante", "refei"], Category::Food),
            (&["transport", "combust", "mobilidade"], Category::Transport),
            (&["shop", "compra", "varejo"], Category::Shopping),
            (&["entertain", "lazer", "divers"], Category::Entertainment),
            (&["health", "saude", "saúde", "medic"], Category::Healthcare),
            (&["bill", "utilit", "conta", "servi"], Category::Bills),
            (&["income", "renda", "salario", "salário", "receita"], Category::Income),
        ];
        for (keywords, category) in LABELS {
            if keywords.iter().any(|k| s.contains(k)) {
                return *category;
            }
        }
        Category::Other
    }
}

// Keyword groups tested in order; the first group with a hit wins and the
// group order is part of the contract: food, transport, shopping,
// entertainment, healthcare, bills, else Other.

const FOOD: &[&str] = &[
    "restaurante", "restaurant", "lanchonete", "padaria", "pizzaria", "pizza",
    "hamburgueria", "churrascaria", "ifood", "supermercado", "hortifruti",
    "acougue", "açougue", "cafeteria", "cafe", "café", "sushi",
];

const TRANSPORT: &[&str] = &[
    "posto", "shell", "ipiranga", "petrobras", "combustivel", "gasolina",
    "etanol", "uber", "taxi", "táxi", "metro", "metrô", "onibus", "ônibus",
    "estacionamento", "pedagio", "pedágio", "passagem",
];

const SHOPPING: &[&str] = &[
    "loja", "lojas", "magazine", "americanas", "mercadolivre", "mercado livre",
    "amazon", "shopee", "aliexpress", "shopping", "livraria", "papelaria",
];

const ENTERTAINMENT: &[&str] = &[
    "cinema", "netflix", "spotify", "teatro", "ingresso", "show", "steam",
    "playstation", "xbox", "streaming", "clube",
];

const HEALTHCARE: &[&str] = &[
    "farmacia", "farmácia", "drogaria", "drogasil", "hospital", "clinica",
    "clínica", "laboratorio", "laboratório", "medico", "médico", "dentista",
    "plano de saude", "plano de saúde",
];

const BILLS: &[&str] = &[
    "energia", "luz", "enel", "sabesp", "agua", "água", "internet",
    "telefone", "celular", "vivo", "claro", "tim ", "aluguel", "condominio",
    "condomínio", "boleto", "iptu", "ipva",
];

const GROUPS: &[(&[&str], Category)] = &[
    (FOOD, Category::Food),
    (TRANSPORT, Category::Transport),
    (SHOPPING, Category::Shopping),
    (ENTERTAINMENT, Category::Entertainment),
    (HEALTHCARE, Category::Healthcare),
    (BILLS, Category::Bills),
];

/// Heuristic categorization from a transaction's display text alone.
///
/// Pure and callable independently of any transaction type — used both to
/// backfill already-imported transactions and to annotate fresh parses.
/// First matching group short-circuits; no scoring.
pub fn categorize(description: &str) -> Category {
    let text = description.to_lowercase();
    for (keywords, category) in GROUPS {
        if keywords.iter().any(|k| text.contains(k)) {
            return *category;
        }
    }
    Category::Other
}

/// Legacy-format variant: the source type code marks deposits as income
/// before any description heuristics run.
pub fn categorize_legacy(trn_type: &str, description: &str) -> Category {
    match trn_type.trim().to_uppercase().as_str() {
        "CREDIT" | "DEP" | "DIRECTDEP" | "INT" | "DIV" => Category::Income,
        _ => categorize(description),
    }
}
