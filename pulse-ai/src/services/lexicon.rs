//! Classification vocabulary
//!
//! The closed topic list and the per-language keyword tables. Prompts
//! enumerate exactly this vocabulary and the keyword fallback matches
//! against it, so a degraded classification stays within the same label
//! space as a model-produced one.
//!
//! Keyword lists mix German, French, Italian and English terms because
//! customers routinely answer in a language other than the survey's.

/// One topic of the closed vocabulary with its fallback keywords
pub struct TopicDef {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

/// The closed topic vocabulary for banking-app feedback
pub const TOPICS: &[TopicDef] = &[
    TopicDef {
        name: "Fees & Pricing",
        keywords: &[
            "fee", "fees", "pricing", "expensive", "cost", "charge", "gebühr", "gebühren",
            "teuer", "kosten", "preis", "frais", "tarif", "cher", "coût", "commissioni",
            "costoso", "costi", "prezzo",
        ],
    },
    TopicDef {
        name: "App Performance",
        keywords: &[
            "slow", "crash", "lag", "freeze", "freezes", "performance", "langsam", "absturz",
            "stürzt", "hängt", "lent", "lente", "plante", "bloque", "lento", "lenta",
            "si blocca", "crasha",
        ],
    },
    TopicDef {
        name: "Customer Support",
        keywords: &[
            "support", "hotline", "helpdesk", "agent", "kundendienst", "kundenservice",
            "beratung", "assistance", "conseiller", "assistenza", "supporto",
        ],
    },
    TopicDef {
        name: "Security",
        keywords: &[
            "security", "secure", "fraud", "phishing", "sicherheit", "sicher", "betrug",
            "sécurité", "fraude", "sicurezza", "frode", "truffa",
        ],
    },
    TopicDef {
        name: "User Interface",
        keywords: &[
            "interface", "design", "layout", "navigation", "unübersichtlich", "oberfläche",
            "benutzeroberfläche", "ergonomie", "interfaccia", "grafica", "schermata",
        ],
    },
    TopicDef {
        name: "Login & Authentication",
        keywords: &[
            "login", "log in", "password", "authentication", "fingerprint", "face id",
            "anmeldung", "anmelden", "passwort", "connexion", "mot de passe", "accesso",
            "autenticazione",
        ],
    },
    TopicDef {
        name: "Transfers & Payments",
        keywords: &[
            "transfer", "payment", "twint", "ebill", "überweisung", "zahlung", "einzahlung",
            "virement", "paiement", "bonifico", "pagamento",
        ],
    },
    TopicDef {
        name: "Card Services",
        keywords: &[
            "credit card", "debit card", "card blocked", "kreditkarte", "debitkarte", "karte",
            "carte", "carta",
        ],
    },
    TopicDef {
        name: "Account Management",
        keywords: &[
            "account", "iban", "statement", "konto", "kontoauszug", "compte", "relevé",
            "conto", "estratto",
        ],
    },
    TopicDef {
        name: "Notifications",
        keywords: &[
            "notification", "notifications", "alert", "push", "benachrichtigung", "meldung",
            "alerte", "notifica", "notifiche", "avviso",
        ],
    },
    TopicDef {
        name: "Onboarding",
        keywords: &[
            "onboarding", "signup", "sign up", "registration", "register", "eröffnung",
            "registrierung", "inscription", "ouverture", "registrazione", "apertura",
        ],
    },
    TopicDef {
        name: "Features",
        keywords: &[
            "feature", "function", "missing", "funktion", "fehlt", "wünsche", "fonction",
            "manque", "fonctionnalité", "funzione", "manca", "funzionalità",
        ],
    },
    TopicDef {
        name: "Reliability",
        keywords: &[
            "reliable", "unreliable", "stable", "outage", "downtime", "bug", "zuverlässig",
            "ausfall", "fehler", "störung", "panne", "erreur", "affidabile", "errore",
            "guasto",
        ],
    },
    TopicDef {
        name: "Documentation & Help",
        keywords: &[
            "faq", "documentation", "instructions", "tutorial", "hilfe", "anleitung", "aide",
            "guide", "aiuto", "guida", "istruzioni",
        ],
    },
];

/// Polarity keywords per language, used by the sentiment fallback
pub struct PolarityKeywords {
    pub positive: &'static [&'static str],
    pub negative: &'static [&'static str],
}

const POLARITY_EN: PolarityKeywords = PolarityKeywords {
    positive: &[
        "great", "good", "love", "excellent", "easy", "fast", "helpful", "perfect",
        "awesome", "reliable", "simple", "intuitive", "smooth",
    ],
    negative: &[
        "bad", "terrible", "awful", "slow", "crash", "hate", "worst", "expensive",
        "broken", "annoying", "useless", "problem", "error", "difficult", "confusing",
        "never works",
    ],
};

const POLARITY_DE: PolarityKeywords = PolarityKeywords {
    positive: &[
        "gut", "super", "toll", "einfach", "schnell", "zuverlässig", "praktisch",
        "übersichtlich", "perfekt", "hilfreich", "top",
    ],
    negative: &[
        "schlecht", "langsam", "absturz", "stürzt", "teuer", "kompliziert", "umständlich",
        "fehler", "ärgerlich", "unübersichtlich", "mühsam", "katastrophe",
    ],
};

const POLARITY_FR: PolarityKeywords = PolarityKeywords {
    positive: &[
        "bien", "bon", "bonne", "excellent", "excellente", "facile", "rapide", "pratique",
        "parfait", "parfaite", "simple", "agréable",
    ],
    negative: &[
        "mauvais", "mauvaise", "lent", "lente", "cher", "chère", "compliqué", "plante",
        "erreur", "problème", "difficile", "nul", "catastrophe",
    ],
};

const POLARITY_IT: PolarityKeywords = PolarityKeywords {
    positive: &[
        "buono", "buona", "ottimo", "ottima", "facile", "veloce", "pratico", "pratica",
        "perfetto", "perfetta", "semplice", "utile",
    ],
    negative: &[
        "cattivo", "pessimo", "pessima", "lento", "lenta", "costoso", "complicato",
        "errore", "problema", "difficile", "inutile", "disastro",
    ],
};

/// Example phrases embedded in the sentiment prompt
pub struct SentimentExamples {
    pub positive: &'static str,
    pub negative: &'static str,
    pub neutral: &'static str,
}

const EXAMPLES_EN: SentimentExamples = SentimentExamples {
    positive: "Great app, very easy to use",
    negative: "The app keeps crashing and support never answers",
    neutral: "I use the app to check my balance",
};

const EXAMPLES_DE: SentimentExamples = SentimentExamples {
    positive: "Tolle App, sehr einfach zu bedienen",
    negative: "Die App stürzt ständig ab und der Support meldet sich nie",
    neutral: "Ich nutze die App um den Kontostand zu prüfen",
};

const EXAMPLES_FR: SentimentExamples = SentimentExamples {
    positive: "Très bonne application, facile à utiliser",
    negative: "L'application plante sans arrêt et le support ne répond jamais",
    neutral: "J'utilise l'application pour consulter mon solde",
};

const EXAMPLES_IT: SentimentExamples = SentimentExamples {
    positive: "Ottima app, molto facile da usare",
    negative: "L'app si blocca di continuo e l'assistenza non risponde mai",
    neutral: "Uso l'app per controllare il saldo",
};

/// Map a stored language code onto a supported prompt language.
/// Unsupported codes fall back to English; the stored row keeps the
/// original code.
pub fn normalize_language(code: &str) -> &'static str {
    match code.trim().to_lowercase().as_str() {
        "de" => "de",
        "fr" => "fr",
        "it" => "it",
        _ => "en",
    }
}

pub fn polarity_keywords(language: &str) -> &'static PolarityKeywords {
    match normalize_language(language) {
        "de" => &POLARITY_DE,
        "fr" => &POLARITY_FR,
        "it" => &POLARITY_IT,
        _ => &POLARITY_EN,
    }
}

pub fn sentiment_examples(language: &str) -> &'static SentimentExamples {
    match normalize_language(language) {
        "de" => &EXAMPLES_DE,
        "fr" => &EXAMPLES_FR,
        "it" => &EXAMPLES_IT,
        _ => &EXAMPLES_EN,
    }
}
