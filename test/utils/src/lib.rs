/// A visitor's questions over one afternoon, in the order they were asked.
pub fn tour_questions() -> Vec<&'static str> {
    return vec![
        "What time does the Temple of Literature open?",
        "How much is the entrance ticket?",
        "Is there a guided tour in English?",
        "Where can I get egg coffee nearby?",
        "Which water puppet show would you recommend tonight?",
        "How long is the walk to Hoan Kiem Lake?",
        "Are there night food tours on weekends?",
        "What traditional music can I hear in the Old Quarter?",
    ];
}

/// A generateContent response body with a single candidate.
pub fn gemini_reply_fixture() -> &'static str {
    return r#"{
  "candidates": [
    {
      "content": {
        "parts": [
          {
            "text": "The Temple of Literature opens at 8:00 and closes at 17:00."
          }
        ],
        "role": "model"
      },
      "finishReason": "STOP",
      "index": 0
    }
  ]
}"#;
}
