//! Supported conversation locales and their opening greetings.
//!
//! The catalog is fixed.  A conversation picks one entry at start and keeps
//! it for its whole lifetime.

use serde::Serialize;

/// One supported locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    /// BCP-47 code sent to every service, e.g. `"hi-IN"`.
    pub code: &'static str,
    /// English display name.
    pub name: &'static str,
    /// First bot message, spoken as soon as the language is chosen.
    pub greeting: &'static str,
}

static LANGUAGES: [Language; 8] = [
    Language {
        code: "hi-IN",
        name: "Hindi",
        greeting: "नमस्ते! मैं आपका लोन सलाहकार हूं। आपको सही लोन विकल्प जल्दी से खोजने में मदद करने के लिए, मुझे बस आपका नाम, आयु और पेशा जानने की जरूरत है। आपका नाम क्या है?",
    },
    Language {
        code: "kn-IN",
        name: "Kannada",
        greeting: "ನಮಸ್ಕಾರ! ನಾನು ನಿಮ್ಮ ಸಾಲದ ಸಲಹೆಗಾರ. ನಿಮಗೆ ಸರಿಯಾದ ಸಾಲದ ಆಯ್ಕೆಗಳನ್ನು ಶೀಘ್ರವಾಗಿ ಕಂಡುಹಿಡಿಯಲು ಸಹಾಯ ಮಾಡಲು, ನಾನು ನಿಮ್ಮ ಹೆಸರು, ವಯಸ್ಸು ಮತ್ತು ವೃತ್ತಿಯನ್ನು ತಿಳಿಯಬೇಕು. ನಿಮ್ಮ ಹೆಸರೇನು?",
    },
    Language {
        code: "te-IN",
        name: "Telugu",
        greeting: "నమస్కారం! నేను మీ రుణ సలహాదారును. మీకు సరైన రుణ ఎంపికలను త్వరగా కనుగొనడంలో సహాయపడటానికి, నేను మీ పేరు, వయస్సు మరియు వృత్తిని తెలుసుకోవాలి. మీ పేరు ఏమిటి?",
    },
    Language {
        code: "ta-IN",
        name: "Tamil",
        greeting: "வணக்கம்! நான் உங்கள் கடன் ஆலோசகர். உங்களுக்கு சரியான கடன் விருப்பங்களை விரைவாகக் கண்டறிய உதவ, உங்கள் பெயர், வயது மற்றும் தொழில் பற்றி தெரிந்துகொள்ள வேண்டும். உங்கள் பெயர் என்ன?",
    },
    Language {
        code: "mr-IN",
        name: "Marathi",
        greeting: "नमस्कार! मी तुमचा कर्ज सल्लागार आहे. तुम्हाला योग्य कर्ज पर्याय लवकर शोधण्यात मदत करण्यासाठी, मला तुमचे नाव, वय आणि व्यवसाय जाणून घेणे आवश्यक आहे. तुमचे नाव काय आहे?",
    },
    Language {
        code: "ml-IN",
        name: "Malayalam",
        greeting: "നമസ്കാരം! ഞാൻ നിങ്ങളുടെ വായ്പാ ഉപദേശകനാണ്. നിങ്ങൾക്ക് ശരിയായ വായ്പാ ഓപ്ഷനുകൾ വേഗത്തിൽ കണ്ടെത്താൻ സഹായിക്കുന്നതിന്, എനിക്ക് നിങ്ങളുടെ പേര്, വയസ്സ്, തൊഴിൽ എന്നിവ അറിയേണ്ടതുണ്ട്. നിങ്ങളുടെ പേര് എന്താണ്?",
    },
    Language {
        code: "gu-IN",
        name: "Gujarati",
        greeting: "નમસ્તે! હું તમારો લોન સલાહકાર છું. તમને યોગ્ય લોન વિકલ્પો ઝડપથી શોધવામાં મદદ કરવા માટે, મારે તમારું નામ, ઉંમર અને વ્યવસાય જાણવાની જરૂર છે. તમારું નામ શું છે?",
    },
    Language {
        code: "en-IN",
        name: "English",
        greeting: "Hello! I'm your loan advisor. To help you find the right loan options quickly, I just need your name, age, and profession to get started. What's your name?",
    },
];

impl Language {
    /// Every supported locale, in menu order.
    pub fn all() -> &'static [Language] {
        &LANGUAGES
    }

    /// Look up a locale by its code.  Matching is ASCII case-insensitive.
    ///
    /// ```
    /// use loan_voice::conversation::Language;
    ///
    /// assert_eq!(Language::find("ta-in").map(|l| l.name), Some("Tamil"));
    /// assert!(Language::find("fr-FR").is_none());
    /// ```
    pub fn find(code: &str) -> Option<&'static Language> {
        LANGUAGES
            .iter()
            .find(|lang| lang.code.eq_ignore_ascii_case(code.trim()))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}
